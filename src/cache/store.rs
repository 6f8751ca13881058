//! Synchronous string stores backing the [`crate::TemporalCache`].

use crate::cache::error::StoreError;
use crate::utils::get_cache_dir;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// A synchronous key to string store.
pub trait Store: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process store, optionally bounded by the total number of value bytes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once the stored values would exceed `capacity_bytes`.
    pub fn with_capacity_bytes(capacity_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    fn used_bytes(&self) -> usize {
        self.entries.values().map(String::len).sum()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        if let Some(capacity) = self.capacity_bytes {
            let replaced = self.entries.get(key).map_or(0, String::len);
            let needed = self.used_bytes() - replaced + value.len();
            if needed > capacity {
                return Err(StoreError::QuotaExceeded { needed, capacity });
            }
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

const FILE_EXTENSION: &str = "json";

/// Stores each entry as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Uses `dir` for entries. The directory is created on the first write.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Uses the per-user cache directory, if the platform has one.
    pub fn in_default_dir() -> Option<Self> {
        get_cache_dir().map(|dir| Self::new(&dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, FILE_EXTENSION))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(path, e)),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Write(self.dir.clone(), e))?;
        let path = self.path_for(key);
        // Write then rename so readers never see a half-written entry.
        let staging = path.with_extension("tmp");
        std::fs::write(&staging, value).map_err(|e| StoreError::Write(staging.clone(), e))?;
        std::fs::rename(&staging, &path).map_err(|e| StoreError::Write(path, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Delete(path, e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::List(self.dir.clone(), e)),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::List(self.dir.clone(), e))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_capacity() {
        let mut store = MemoryStore::with_capacity_bytes(10);
        store.set("a", "12345".to_string()).unwrap();
        store.set("a", "1234567890".to_string()).unwrap();
        assert!(matches!(
            store.set("b", "x".to_string()),
            Err(StoreError::QuotaExceeded {
                needed: 11,
                capacity: 10
            })
        ));
        store.remove("a").unwrap();
        store.set("b", "x".to_string()).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_file_store_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut store = FileStore::new(&dir.path().join("nested"));

        assert_eq!(store.keys()?, Vec::<String>::new());
        assert_eq!(store.get("weather_historical_51.51_-0.13")?, None);

        store.set("weather_historical_51.51_-0.13", "{}".to_string())?;
        assert_eq!(
            store.get("weather_historical_51.51_-0.13")?,
            Some("{}".to_string())
        );
        assert_eq!(store.keys()?, vec!["weather_historical_51.51_-0.13".to_string()]);

        store.remove("weather_historical_51.51_-0.13")?;
        store.remove("weather_historical_51.51_-0.13")?;
        assert!(store.keys()?.is_empty());
        Ok(())
    }
}
