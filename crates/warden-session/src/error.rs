//! Error types for the session layer.

/// Why a remote identity confirmation failed.
///
/// The controller treats every variant the same way (clear the credential,
/// end up unauthenticated); the distinction exists for logs and for
/// callers using a confirmer directly.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmationError {
    /// The HTTP client could not be constructed.
    #[error("failed to build identity client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response (DNS, connect, timeout).
    #[error("identity request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status, e.g. 401.
    #[error("identity endpoint returned status {0}")]
    Status(u16),

    /// A success response whose body is not a JSON object.
    #[error("identity response body is invalid: {0}")]
    Body(#[source] reqwest::Error),

    /// Any other refusal, for confirmers that don't speak HTTP.
    #[error("identity rejected: {0}")]
    Rejected(String),
}
