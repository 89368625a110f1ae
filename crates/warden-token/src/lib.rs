//! Bearer token decoding and local validity rules for Warden.
//!
//! This crate is the bottom of the stack. It knows how to look inside a
//! compact three-segment bearer token and decide whether the client should
//! still trust it:
//!
//! - **Codec** ([`decode`], [`encode_unsigned`]) — splits the token and turns
//!   the payload segment into [`Claims`].
//! - **Validator** ([`validate`]) — applies the presence, structure and
//!   expiry rules and returns a [`Validation`].
//! - **Time** ([`UnixMillis`]) — the wall-clock instant every decision is
//!   made against.
//!
//! Nothing here performs I/O, and nothing here checks signatures. The
//! signature segment is carried along untouched; the server is the only
//! party that can actually verify a token.
//!
//! ```text
//! TokenStore (strings) → Token layer (Claims, Validation) → Guard / Controller
//! ```

mod claims;
mod codec;
mod error;
mod time;
mod validator;

pub use claims::Claims;
pub use codec::{decode, encode_unsigned};
pub use error::DecodeError;
pub use time::UnixMillis;
pub use validator::{InvalidReason, Validation, validate};
