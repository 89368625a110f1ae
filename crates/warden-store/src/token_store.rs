//! The persisted credential: a token and a separately stored role.
//!
//! [`TokenStore`] is a thin, key-aware layer over a [`KeyValueStore`]. It owns
//! three decisions the rest of the stack shouldn't care about:
//!
//! - **Which key holds the token.** A primary key is checked first, then one
//!   legacy key for credentials written by older clients. We never write the
//!   legacy key.
//! - **What a read failure means.** Nothing: a storage error on read is logged
//!   and treated as "no token", so the system fails toward unauthenticated.
//! - **What "logged out" looks like.** [`clear`](TokenStore::clear) removes
//!   every key that could make [`get`](TokenStore::get) return a token.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{KeyValueStore, StorageError};

/// Names of the storage keys the credential lives under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Primary token key. Read first, and the only token key written.
    pub token: String,
    /// Fallback token key, read-only.
    pub legacy_token: String,
    /// Role key. Used when the token's claims carry no role.
    pub role: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            token: "access_token".to_string(),
            legacy_token: "token".to_string(),
            role: "role".to_string(),
        }
    }
}

/// What the login/verification step hands back: a token and the user's role.
///
/// Deserializes directly from the verification endpoint's response body,
/// `{"access_token": "...", "role": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginGrant {
    pub access_token: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Reads, writes and clears the persisted credential.
///
/// Cheap to clone; clones share the same underlying storage.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl TokenStore {
    /// Creates a store over `storage` with the default key names.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_keys(storage, StorageKeys::default())
    }

    pub fn with_keys(storage: Arc<dyn KeyValueStore>, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Returns the stored token: primary key first, then the legacy key.
    ///
    /// Empty values are skipped. Read failures are logged and yield `None`.
    pub fn get(&self) -> Option<String> {
        self.read(&self.keys.token)
            .or_else(|| self.read(&self.keys.legacy_token))
    }

    /// Returns the separately stored role, if any.
    pub fn role(&self) -> Option<String> {
        self.read(&self.keys.role)
    }

    /// Writes the token under the primary key.
    pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
        self.storage.set(&self.keys.token, token)
    }

    /// Writes the role. Last writer wins.
    pub fn set_role(&self, role: &str) -> Result<(), StorageError> {
        self.storage.set(&self.keys.role, role)
    }

    /// Persists a fresh login: token, then role (if the grant carries one).
    pub fn persist_login(&self, grant: &LoginGrant) -> Result<(), StorageError> {
        self.set_token(&grant.access_token)?;
        if let Some(role) = &grant.role {
            self.set_role(role)?;
        }
        tracing::info!(role = ?grant.role, "credential persisted");
        Ok(())
    }

    /// Removes the token (both keys) and the role.
    ///
    /// Every key is attempted even if an earlier removal fails, so one bad
    /// key can't keep the others alive. Returns the first error seen.
    /// Idempotent: clearing an empty store succeeds and changes nothing.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in [&self.keys.token, &self.keys.legacy_token, &self.keys.role] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key = %key, error = %e, "failed to remove credential key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "credential read failed, treating as absent");
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("keys", &self.keys).finish_non_exhaustive()
    }
}
