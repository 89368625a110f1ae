//! Error types for the token layer.
//!
//! Each crate in Warden defines its own error enum. A `DecodeError` always
//! means "this string is not a token we can read"; it never means the token
//! is expired or that the user lacks a role.

/// Reasons a bearer token could not be decoded into [`Claims`](crate::Claims).
///
/// Callers outside this crate rarely see these directly: the validator folds
/// every variant into [`InvalidReason::Malformed`](crate::InvalidReason).
/// They are kept distinct so logs can say *why* a token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The token did not split into exactly three segments.
    #[error("expected 3 segments, found {0}")]
    Segments(usize),

    /// Three segments, but the one at this 1-based position is empty.
    #[error("segment {0} of 3 is empty")]
    EmptySegment(usize),

    /// The payload segment is not valid URL-safe base64.
    #[error("payload is not valid base64: {0}")]
    Base64(#[source] base64::DecodeError),

    /// The payload decoded to bytes that are not a JSON claims object
    /// (invalid JSON, invalid UTF-8, or a claim of the wrong type).
    #[error("payload is not a JSON claims object: {0}")]
    Json(#[source] serde_json::Error),

    /// The payload is valid JSON, but not an object (e.g. an array or a
    /// bare number).
    #[error("payload is JSON but not an object")]
    NotAnObject,
}
