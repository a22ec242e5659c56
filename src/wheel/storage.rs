//! Client-local key-value storage.
//!
//! The library cache only ever needs string values under a couple of fixed
//! keys, the same shape as a browser's `localStorage`. [`MemoryStore`] backs
//! tests and throwaway sessions, [`FileStore`] keeps one file per key in a
//! directory for the terminal client.

use crate::error::ClientError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Remove every entry owned by this store.
    fn clear(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ClientError::Storage("memory store lock poisoned".to_string()))?;
        entries.clear();
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read stored key '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| ClientError::Storage(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .map_err(|e| ClientError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn clear(&self) -> Result<(), ClientError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ClientError::Storage(format!("{}: {}", self.dir.display(), e))),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)
                    .map_err(|e| ClientError::Storage(format!("{}: {}", path.display(), e)))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip_and_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get("libraryItems"), None);

        store.set("libraryItems", "[]").unwrap();
        store.set("libraryExpiry", "1700000000").unwrap();
        assert_eq!(store.get("libraryItems").as_deref(), Some("[]"));

        store.clear().unwrap();
        assert_eq!(store.get("libraryItems"), None);
        assert_eq!(store.get("libraryExpiry"), None);
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = std::env::temp_dir().join(format!("wheelplex-store-{}", std::process::id()));
        let store = FileStore::new(&dir);

        assert_eq!(store.get("libraryExpiry"), None);
        store.clear().unwrap();

        store.set("libraryExpiry", "42").unwrap();
        assert_eq!(store.get("libraryExpiry").as_deref(), Some("42"));

        store.clear().unwrap();
        assert_eq!(store.get("libraryExpiry"), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
