//! Lifecycle states and controller configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;
use warden_token::UnixMillis;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ask the [`IdentityConfirmer`](crate::IdentityConfirmer) about the
    /// token on every `activate()`. Default: `true`.
    pub confirm_identity: bool,

    /// Where logged-out users are sent. Default: `"/"`.
    pub entry_point: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirm_identity: true,
            entry_point: "/".into(),
        }
    }
}

impl SessionConfig {
    /// Replaces an unusable entry point with `"/"`.
    pub fn validated(mut self) -> Self {
        if !self.entry_point.starts_with('/') {
            warn!(entry_point = %self.entry_point, "entry point must be an absolute path, using /");
            self.entry_point = "/".into();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// LifecycleState
// ---------------------------------------------------------------------------

/// Where the controller is in a session's life.
///
/// ```text
///   Uninitialized ──activate()──→ Checking ──valid──→ Active
///                                    │                  │  │
///                                 invalid        timer  │  │ logout()
///                                    ▼                  ▼  │
///                             Unauthenticated ←── Expired  │
///                                    ↑─────────────────────┘
/// ```
///
/// `Expired` is momentary: the controller moves on to `Unauthenticated`
/// right after clearing the credential, so it is only ever seen by
/// subscribers. `deactivate()` puts a checking or active controller back
/// to `Uninitialized` without touching the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Checking,
    Active {
        role: Option<String>,
        /// `None` for a token without `exp`; such a session never expires locally.
        expires_at: Option<UnixMillis>,
    },
    Expired,
    Unauthenticated,
}

impl LifecycleState {
    pub fn is_active(&self) -> bool {
        matches!(self, LifecycleState::Active { .. })
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Checking => "checking",
            LifecycleState::Active { .. } => "active",
            LifecycleState::Expired => "expired",
            LifecycleState::Unauthenticated => "unauthenticated",
        }
    }
}
