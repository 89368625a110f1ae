//! Local validity rules: presence, structure, expiry.
//!
//! [`validate`] is the single place that decides whether a stored token is
//! still worth trusting on this client. It is pure: the same
//! `(token, now)` always produces the same [`Validation`].

use std::fmt;

use crate::{Claims, UnixMillis, decode};

/// Why a token was rejected.
///
/// Checked in this order; the first failing rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidReason {
    /// No token was supplied (absent or empty).
    Missing,
    /// The token could not be decoded.
    Malformed,
    /// The token decoded, but its `exp` has been reached.
    Expired,
}

impl InvalidReason {
    /// Stable lowercase name, suitable for logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Malformed => "malformed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid(Claims),
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The claims, if the token was valid.
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Valid(claims) => Some(claims),
            Self::Invalid(_) => None,
        }
    }

    /// The rejection reason, if the token was invalid.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }
}

/// Validates `token` against the wall-clock instant `now`.
///
/// Decode failures never escape as errors; they become
/// [`InvalidReason::Malformed`]. Expiry uses whole-second truncation of
/// `now` (see [`Claims::is_expired_at`]).
pub fn validate(token: Option<&str>, now: UnixMillis) -> Validation {
    let token = match token {
        Some(t) if !t.is_empty() => t,
        _ => return Validation::Invalid(InvalidReason::Missing),
    };

    let Ok(claims) = decode(token) else {
        return Validation::Invalid(InvalidReason::Malformed);
    };

    if claims.is_expired_at(now) {
        return Validation::Invalid(InvalidReason::Expired);
    }

    Validation::Valid(claims)
}
