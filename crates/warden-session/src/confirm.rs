//! Remote identity confirmation hook.
//!
//! Local validation only proves a token *looks* alive. When the application
//! wants the server's opinion, the controller asks an [`IdentityConfirmer`]
//! once per activation. The server's answer is authoritative for the role.

use serde::{Deserialize, Serialize};

use crate::ConfirmationError;

/// What the server says about the current credential.
///
/// Every field is optional; `{}` is a valid confirmation that changes
/// nothing locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmedIdentity {
    pub role: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Confirms a token with whoever issued it.
///
/// # Trait bounds
///
/// - `Send + Sync` → the confirmer is shared with the controller, which may
///   be driven from any task.
/// - `'static` → it lives as long as the controller that owns it.
///
/// # Example
///
/// ```rust
/// use warden_session::{ConfirmationError, ConfirmedIdentity, IdentityConfirmer};
///
/// /// Trusts every token and reports a fixed role.
/// struct FixedRole(&'static str);
///
/// impl IdentityConfirmer for FixedRole {
///     async fn confirm(&self, _token: &str) -> Result<ConfirmedIdentity, ConfirmationError> {
///         Ok(ConfirmedIdentity {
///             role: Some(self.0.to_string()),
///             ..ConfirmedIdentity::default()
///         })
///     }
/// }
/// ```
pub trait IdentityConfirmer: Send + Sync + 'static {
    /// Asks the server about `token`.
    ///
    /// # Returns
    /// - `Ok(identity)` → the server accepted the token
    /// - `Err(_)` → anything else; network failure and 401 are not told apart
    fn confirm(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<ConfirmedIdentity, ConfirmationError>> + Send;
}

/// A confirmer that accepts every token without asking anyone.
///
/// Used when the controller is configured without remote confirmation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConfirmation;

impl IdentityConfirmer for NoConfirmation {
    async fn confirm(&self, _token: &str) -> Result<ConfirmedIdentity, ConfirmationError> {
        Ok(ConfirmedIdentity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_confirmation_returns_empty_identity() {
        let identity = NoConfirmation.confirm("h.p.s").await.unwrap();
        assert_eq!(identity, ConfirmedIdentity::default());
    }

    #[test]
    fn test_identity_deserializes_partial_body() {
        let identity: ConfirmedIdentity =
            serde_json::from_str(r#"{"role":"admin","id":42}"#).unwrap();
        assert_eq!(identity.role.as_deref(), Some("admin"));
        assert_eq!(identity.email, None);
    }
}
