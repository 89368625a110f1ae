//! Where the controller sends the user when a session ends.

use parking_lot::Mutex;
use tracing::info;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutCause {
    /// The token's lifetime ran out.
    Expired,
    /// Someone called `logout()`.
    Explicit,
}

impl LogoutCause {
    pub fn as_str(self) -> &'static str {
        match self {
            LogoutCause::Expired => "expired",
            LogoutCause::Explicit => "explicit",
        }
    }
}

/// An instruction for the application's router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDirective {
    /// Go to the unauthenticated entry point.
    EntryPoint { path: String, cause: LogoutCause },
}

/// Receives navigation directives.
///
/// Called after the credential has been cleared, never before. The
/// controller holds no locks while calling it, so an implementation may
/// call back into the controller.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, directive: NavigationDirective);
}

/// Keeps every directive it receives.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    directives: Mutex<Vec<NavigationDirective>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn directives(&self) -> Vec<NavigationDirective> {
        self.directives.lock().clone()
    }

    /// Drains the recorded directives.
    pub fn take(&self) -> Vec<NavigationDirective> {
        std::mem::take(&mut *self.directives.lock())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, directive: NavigationDirective) {
        self.directives.lock().push(directive);
    }
}

/// Logs directives and does nothing else. Handy for headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, directive: NavigationDirective) {
        match directive {
            NavigationDirective::EntryPoint { path, cause } => {
                info!(%path, cause = cause.as_str(), "navigate to entry point");
            }
        }
    }
}
