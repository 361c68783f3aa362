//! Key/value stores with expiry used to cache search result sets.
//!
//! Two stores are provided: [`MemoryStore`] keeps entries in the process and
//! [`FileStore`] keeps one JSON file per key so entries survive restarts.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/catalog-search/
//!   <key>.json
//! ```
//!
//! Each file holds the cached value plus its expiry metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime};

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<T> {
    /// Item was found and is valid
    Hit(T),

    /// Item was not found
    Miss,

    /// Item was found but has expired
    Expired,
}

impl<T> CacheResult<T> {
    /// The cached value, if it is still valid
    pub fn hit(self) -> Option<T> {
        match self {
            CacheResult::Hit(value) => Some(value),
            CacheResult::Miss | CacheResult::Expired => None,
        }
    }
}

/// A string key/value store with per-entry expiry.
///
/// Entries are written whole and never merged.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> CacheResult<String>;

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> std::io::Result<()>;
}

/// Process-wide in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, Option<Instant>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CacheResult<String> {
        let mut entries = self.entries();
        match entries.get(key) {
            None => return CacheResult::Miss,
            Some((value, expires_at)) if expires_at.map_or(true, |at| Instant::now() < at) => {
                return CacheResult::Hit(value.clone());
            }
            Some(_) => {}
        }
        entries.remove(key);
        CacheResult::Expired
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> std::io::Result<()> {
        self.entries()
            .insert(key.to_string(), (value.to_string(), Instant::now().checked_add(ttl)));
        Ok(())
    }
}

/// Cache metadata stored with each cached item
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMetadata {
    /// When the item was cached (Unix timestamp)
    cached_at: u64,

    /// When the item expires (Unix timestamp)
    expires_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEntry {
    metadata: CacheMetadata,
    value: String,
}

/// Store keeping one JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_dir`, creating the directory
    pub fn new(base_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        tracing::info!("Cache initialized at: {}", base_dir.display());
        Ok(Self { base_dir })
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Remove every cached entry
    pub fn clear(&self) -> std::io::Result<()> {
        let _ = fs::remove_dir_all(&self.base_dir);
        fs::create_dir_all(&self.base_dir)?;
        tracing::info!("Cache cleared");
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // keys are hashes, but keep stray separators out of the path
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{name}.json"))
    }

    /// Read a cached file and deserialize it
    fn read_cache_file(&self, path: &Path) -> Result<CachedEntry, std::io::Error> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Serialize and write a cached file
    fn write_cache_file(&self, path: &Path, data: &CachedEntry) -> Result<(), std::io::Error> {
        let content = serde_json::to_string(data)?;
        fs::write(path, content)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> CacheResult<String> {
        let path = self.path_for(key);
        match self.read_cache_file(&path) {
            Ok(cached) if unix_now() >= cached.metadata.expires_at => {
                tracing::debug!("Cache expired: {}", key);
                let _ = fs::remove_file(&path);
                CacheResult::Expired
            }
            Ok(cached) => {
                tracing::debug!("Cache HIT: {}", key);
                CacheResult::Hit(cached.value)
            }
            Err(_) => {
                tracing::debug!("Cache MISS: {}", key);
                CacheResult::Miss
            }
        }
    }

    fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> std::io::Result<()> {
        let now = unix_now();
        let entry = CachedEntry {
            metadata: CacheMetadata {
                cached_at: now,
                expires_at: now.saturating_add(ttl.as_secs()),
            },
            value: value.to_string(),
        };
        self.write_cache_file(&self.path_for(key), &entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip_and_expiry() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), CacheResult::Miss);

        store.set_ex("k", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("k"), CacheResult::Hit("v".to_string()));

        store.set_ex("k", "w", Duration::ZERO).unwrap();
        assert_eq!(store.get("k"), CacheResult::Expired);
        assert!(store.is_empty());
    }

    #[test]
    fn test_unbounded_ttl_does_not_overflow() {
        let dir = TempDir::new().unwrap();
        let files = FileStore::new(dir.path()).unwrap();
        let memory = MemoryStore::new();

        for store in [&files as &dyn KeyValueStore, &memory] {
            store.set_ex("forever", "v", Duration::MAX).unwrap();
            assert_eq!(store.get("forever").hit().as_deref(), Some("v"));
        }
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("cache")).unwrap();

        assert_eq!(store.get("library_search_abc"), CacheResult::Miss);
        store
            .set_ex("library_search_abc", "[\"x\"]", Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            store.get("library_search_abc").hit().as_deref(),
            Some("[\"x\"]")
        );
        assert!(store.cache_dir().join("library_search_abc.json").exists());
    }

    #[test]
    fn test_file_store_expiry_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();

        store.set_ex("old", "v", Duration::ZERO).unwrap();
        assert_eq!(store.get("old"), CacheResult::Expired);

        store.set_ex("new", "v", Duration::from_secs(60)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get("new"), CacheResult::Miss);
    }

    #[test]
    fn test_file_store_key_sanitization() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        store.set_ex("../escape", "v", Duration::from_secs(60)).unwrap();
        assert!(dir.path().join("___escape.json").exists());
    }
}
