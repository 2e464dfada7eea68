//! services/api/src/adapters/kv_backend.rs
//!
//! Key-value backends for the local storage adapter: a directory of JSON
//! files for durable runs, and an in-memory map for ephemeral ones.

use aussie_joke_core::ports::{PortError, PortResult};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A minimal string key-value store, in the spirit of browser local storage.
pub trait KeyValueBackend: Send + Sync {
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    /// Inserts or replaces the value under `key`.
    fn put(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removes `key`. Succeeds even if the key did not exist.
    fn delete(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// File Backend
//=========================================================================================

/// Stores each key as `<dir>/<key>.json`. The directory is created on first write.
///
/// Values are written to a temporary file in the same directory and renamed
/// over the target, so a reader sees either the old value or the new one.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PortError::Storage(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&self, key: &str, value: &str) -> PortResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            PortError::Storage(format!("create_dir_all {}: {}", self.dir.display(), e))
        })?;
        let path = self.path_for(key);
        let write_err = |e: std::io::Error| {
            PortError::Storage(format!("write {}: {}", path.display(), e))
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(value.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Storage(format!(
                "remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

//=========================================================================================
// Memory Backend
//=========================================================================================

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Storage("memory backend lock poisoned".to_string()))
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> PortResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}
