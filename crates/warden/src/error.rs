//! Unified error type for Warden.

use warden_session::ConfirmationError;
use warden_store::StorageError;
use warden_token::DecodeError;

/// Top-level error that wraps all crate-specific errors.
///
/// Decisions (`authorize`, `activate`, ...) never return this; it shows up
/// only where a caller explicitly asks for a fallible operation, such as
/// opening a credential file or decoding a token for display.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Confirmation(#[from] ConfirmationError),

    /// No clock was configured and there is no Tokio runtime to build one on.
    #[error("no clock configured and no Tokio runtime is running")]
    NoRuntime,
}
