//! The decoded payload of a bearer token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::UnixMillis;

/// Claims carried in a token's payload segment.
///
/// No claim is mandatory. Fields this crate doesn't interpret are kept in
/// [`extra`](Self::extra), so servers can add claims without breaking
/// older clients.
///
/// `#[serde(default)]` lets a payload like `{}` decode successfully into a
/// `Claims` where every field is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    /// Expiry, in whole seconds since the Unix epoch.
    /// `None` means the token never expires locally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// The role the issuer granted (e.g. `"admin"`, `"employee"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Subject, usually the user's email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Every other claim (`iat`, `iss`, custom ones), untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// The identity to show the user: `sub`, falling back to `email`.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref().or(self.email.as_deref())
    }

    /// The instant the token stops being valid, if it has an `exp`.
    pub fn expires_at(&self) -> Option<UnixMillis> {
        self.exp.map(UnixMillis::from_secs)
    }

    /// `true` if `exp` is present and `now` has reached it.
    ///
    /// Comparison happens in whole seconds: the token is valid through
    /// `exp - 1` and invalid from `exp` onward.
    pub fn is_expired_at(&self, now: UnixMillis) -> bool {
        self.exp.is_some_and(|exp| now.as_secs() >= exp)
    }
}
