/// Errors that can occur while reading or writing persisted credentials.
///
/// Read failures are never fatal to a session decision: [`TokenStore`]
/// logs them and reports "no token", which fails safe toward
/// unauthenticated. Only explicit writes surface them to callers.
///
/// [`TokenStore`]: crate::TokenStore
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage medium could not be read or written.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted file exists but is not a JSON object of strings.
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The backend refused the operation for another reason.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
