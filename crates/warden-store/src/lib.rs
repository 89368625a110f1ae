//! Persisted credential storage for Warden.
//!
//! Provides the [`KeyValueStore`] capability trait that abstracts over where
//! the credential actually lives, and [`TokenStore`], which knows which keys
//! hold the token and the role.
//!
//! # Implementations
//!
//! - [`MemoryStore`] — process-local map, for tests and ephemeral sessions
//! - [`FileStore`] — JSON file on disk, survives restarts

mod error;
mod file;
mod memory;
mod token_store;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use token_store::{LoginGrant, StorageKeys, TokenStore};

/// A durable string key-value store.
///
/// This is the only shared mutable resource in the session stack. Writes are
/// last-writer-wins; implementations don't need to queue or merge concurrent
/// writers beyond whatever their medium guarantees.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_store_is_object_safe() {
        // TokenStore holds an `Arc<dyn KeyValueStore>`; this must keep compiling.
        let store: std::sync::Arc<dyn KeyValueStore> = std::sync::Arc::new(MemoryStore::new());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
