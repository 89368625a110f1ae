//! Token codec: compact string ⇄ [`Claims`].
//!
//! A bearer token looks like `header.payload.signature`, each segment URL-safe
//! base64. We only ever look at the middle one. The header is not inspected
//! and the signature is never verified here.
//!
//! Decoding goes through the *standard* alphabet on purpose: the payload is
//! rewritten (`-` → `+`, `_` → `/`, right-padded with `=`) and then decoded
//! strictly. That accepts both padded and unpadded URL-safe input, which is
//! what issuers produce in practice.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::Value;

use crate::{Claims, DecodeError};

/// Header used by [`encode_unsigned`]. `alg: none` makes it obvious to any
/// reader that nothing was signed.
const UNSIGNED_HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

/// Placeholder signature segment for [`encode_unsigned`].
const UNSIGNED_SIGNATURE: &str = "unsigned";

/// Decodes a bearer token's payload into [`Claims`].
///
/// # Errors
/// - [`DecodeError::Segments`] — not exactly three segments
/// - [`DecodeError::EmptySegment`] — three segments, one of them empty
/// - [`DecodeError::Base64`] — the payload is not URL-safe base64
/// - [`DecodeError::Json`] / [`DecodeError::NotAnObject`] — the bytes are
///   not a JSON claims object
///
/// No partial claims are ever returned: it's all or nothing.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Segments(segments.len()));
    }
    if let Some(index) = segments.iter().position(|s| s.is_empty()) {
        return Err(DecodeError::EmptySegment(index + 1));
    }

    let bytes = decode_segment(segments[1])?;

    // serde_json validates UTF-8 while parsing, so multi-byte characters in
    // claim values come through exactly as the issuer wrote them.
    let value: Value = serde_json::from_slice(&bytes).map_err(DecodeError::Json)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    serde_json::from_value(value).map_err(DecodeError::Json)
}

/// Builds an **unsigned** three-segment token around `payload`.
///
/// Meant for tests, fixtures and demos. The result decodes with [`decode`],
/// but no server will accept it.
pub fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(UNSIGNED_HEADER);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.{UNSIGNED_SIGNATURE}")
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let mut normalized: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let padding = (4 - normalized.len() % 4) % 4;
    normalized.extend(std::iter::repeat_n('=', padding));

    STANDARD.decode(normalized).map_err(DecodeError::Base64)
}
