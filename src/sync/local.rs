//! Local key-value cache
//!
//! A small string-to-string store in the spirit of browser local storage.
//! The file-backed cache keeps every key in one JSON object and rewrites
//! the file on each `set`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::SyncError;

/// A synchronous string key-value cache
pub trait LocalCache: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
}

/// Cache persisted as a JSON object on disk
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCache {
    /// Open the cache at `path`, starting empty if the file does not exist
    /// or cannot be parsed
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable cache file {:?}: {}", path, e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self { path, entries: Mutex::new(entries) }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, entries: &HashMap<String, String>) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::CacheError(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)
            .map_err(|e| SyncError::CacheError(format!("Failed to write {:?}: {}", self.path, e)))
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::CacheError("cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        self.write_file(&entries)
    }
}

/// Cache held in memory only
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with one entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let cache = Self::new();
        if let Ok(mut entries) = cache.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        cache
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        self.entries
            .lock()
            .map_err(|_| SyncError::CacheError("cache lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cache_get_and_set() {
        let cache = MemoryCache::new();
        assert!(cache.get("progress-u1").is_none());

        cache.set("progress-u1", r#"{"chapter":1,"section":0}"#).unwrap();
        assert_eq!(cache.get("progress-u1").as_deref(), Some(r#"{"chapter":1,"section":0}"#));

        cache.set("progress-u1", "replaced").unwrap();
        assert_eq!(cache.get("progress-u1").as_deref(), Some("replaced"));
    }

    #[test]
    fn file_cache_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cache.json");

        let cache = FileCache::open(&path);
        cache.set("progress-guest", r#"{"chapter":0,"section":2}"#).unwrap();
        cache.set("progress-u1", r#"{"chapter":3,"section":1}"#).unwrap();

        let reopened = FileCache::open(&path);
        assert_eq!(reopened.get("progress-guest").as_deref(), Some(r#"{"chapter":0,"section":2}"#));
        assert_eq!(reopened.get("progress-u1").as_deref(), Some(r#"{"chapter":3,"section":1}"#));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn file_cache_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{{{ not json").unwrap();

        let cache = FileCache::open(&path);
        assert!(cache.get("anything").is_none());
        cache.set("k", "v").unwrap();
        assert_eq!(FileCache::open(&path).get("k").as_deref(), Some("v"));
    }
}
