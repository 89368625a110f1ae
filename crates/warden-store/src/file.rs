//! File-backed [`KeyValueStore`]: a JSON object on disk.
//!
//! The whole map is rewritten on every mutation. Credentials are a handful of
//! short strings, so that's cheap, and it keeps the file a plain
//! `{"key": "value"}` object anyone can inspect.
//!
//! Writes go to a sibling temp file first and are then renamed over the
//! target, so a crash mid-write leaves either the old or the new contents,
//! never a truncated file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::{KeyValueStore, StorageError};

/// Durable store that survives process restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Cached copy of the file contents. Only replaced after a successful
    /// write, so it never runs ahead of what's on disk.
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// A missing file is an empty store; the parent directory is created
    /// if needed. The file itself is only written on the first mutation.
    ///
    /// # Errors
    /// - [`StorageError::Io`] — the directory or file can't be accessed
    /// - [`StorageError::Corrupt`] — the file isn't a JSON object of strings
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(StorageError::Corrupt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "file store opened");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the map, persists it, then commits it.
    fn mutate(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        write_atomically(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|map| map.remove(key).is_some())
    }
}

fn write_atomically(
    path: &Path,
    entries: &BTreeMap<String, String>,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(entries).map_err(StorageError::Corrupt)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
