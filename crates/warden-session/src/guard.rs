//! The route guard: may the current credential see this view?
//!
//! Every decision reads the stored token afresh and validates it against
//! the clock. Nothing is cached between calls, so a logout in another part
//! of the application is observed by the very next decision.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{trace, warn};
use warden_store::TokenStore;
use warden_timer::Clock;
use warden_token::{Claims, UnixMillis, Validation, validate};

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Outcome of [`RouteGuard::authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    /// No usable credential. The stored one (if any) has been cleared.
    DenyUnauthenticated,
    /// Valid credential, wrong role. The credential is left intact: it may
    /// still be good for another role's views.
    DenyWrongRole,
}

impl Authorization {
    pub fn is_allowed(self) -> bool {
        self == Authorization::Allow
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Authorization::Allow => "allow",
            Authorization::DenyUnauthenticated => "deny_unauthenticated",
            Authorization::DenyWrongRole => "deny_wrong_role",
        }
    }
}

/// Outcome of [`RouteGuard::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    /// Send the user here instead; never render the requested view.
    Redirect(String),
}

/// The derived session, as a navigation bar would show it.
///
/// Computed on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub role: Option<String>,
    pub subject: Option<String>,
    pub expires_at: Option<UnixMillis>,
}

// ---------------------------------------------------------------------------
// RouteTable
// ---------------------------------------------------------------------------

/// Access rule for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    /// Needs a valid credential, and the given role if one is named.
    Protected { role: Option<String> },
}

/// Maps concrete paths to access rules.
///
/// Paths are matched exactly, ignoring a query string and a trailing
/// slash. Paths not in the table redirect to the entry point.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entry_point: String,
    routes: BTreeMap<String, RouteAccess>,
}

impl RouteTable {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            routes: BTreeMap::new(),
        }
    }

    /// The employee portal: login and OTP pages are public, the admin area
    /// needs `admin`, the employee area needs `employee`.
    pub fn portal() -> Self {
        Self::new("/")
            .public("/")
            .public("/verify-otp")
            .protected("/admin", Some("admin"))
            .protected("/admin/settings", Some("admin"))
            .protected("/employee", Some("employee"))
    }

    pub fn public(mut self, path: &str) -> Self {
        self.routes.insert(normalize(path).to_string(), RouteAccess::Public);
        self
    }

    pub fn protected(mut self, path: &str, role: Option<&str>) -> Self {
        self.routes.insert(
            normalize(path).to_string(),
            RouteAccess::Protected {
                role: role.map(str::to_string),
            },
        );
        self
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn access(&self, path: &str) -> Option<&RouteAccess> {
        self.routes.get(normalize(path))
    }
}

/// The session's role: the token's own claim, else the separately stored
/// role.
pub(crate) fn effective_role(claims: &Claims, store: &TokenStore) -> Option<String> {
    claims.role.clone().or_else(|| store.role())
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

// ---------------------------------------------------------------------------
// RouteGuard
// ---------------------------------------------------------------------------

/// Decides whether protected content may render.
#[derive(Clone)]
pub struct RouteGuard {
    store: TokenStore,
    clock: Arc<dyn Clock>,
}

impl RouteGuard {
    pub fn new(store: TokenStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Checks the stored credential against `required_role`.
    ///
    /// An invalid credential (missing, malformed or expired) is cleared
    /// before returning [`Authorization::DenyUnauthenticated`].
    pub fn authorize(&self, required_role: Option<&str>) -> Authorization {
        let Some(claims) = self.current_claims() else {
            trace!(required_role, "deny: unauthenticated");
            return Authorization::DenyUnauthenticated;
        };

        let role = effective_role(&claims, &self.store);
        match required_role {
            Some(required) if role.as_deref() != Some(required) => {
                trace!(required_role = required, role = ?role, "deny: wrong role");
                Authorization::DenyWrongRole
            }
            _ => {
                trace!(required_role, "allow");
                Authorization::Allow
            }
        }
    }

    /// Decides what to do with a navigation to `path`.
    pub fn resolve(&self, table: &RouteTable, path: &str) -> RouteDecision {
        let redirect = || RouteDecision::Redirect(table.entry_point().to_string());
        match table.access(path) {
            Some(RouteAccess::Public) => RouteDecision::Render,
            Some(RouteAccess::Protected { role }) => {
                if self.authorize(role.as_deref()).is_allowed() {
                    RouteDecision::Render
                } else {
                    redirect()
                }
            }
            None => {
                trace!(path, "unknown route");
                redirect()
            }
        }
    }

    /// The current session as the user should see it.
    ///
    /// Same fail-safe as [`authorize`](Self::authorize): an invalid stored
    /// credential is cleared and reported as unauthenticated.
    pub fn session(&self) -> SessionSnapshot {
        match self.current_claims() {
            Some(claims) => SessionSnapshot {
                authenticated: true,
                subject: claims.subject().map(str::to_string),
                expires_at: claims.expires_at(),
                role: effective_role(&claims, &self.store),
            },
            None => SessionSnapshot::default(),
        }
    }

    /// Validated claims of the stored token; clears it if invalid.
    fn current_claims(&self) -> Option<Claims> {
        let token = self.store.get();
        match validate(token.as_deref(), self.clock.now()) {
            Validation::Valid(claims) => Some(claims),
            Validation::Invalid(reason) => {
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, %reason, "failed to clear invalid credential");
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for RouteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGuard")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
