use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::Storage;
use crate::error::StorageError;

/// In-memory storage backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying map), so a test can
/// keep a handle and inspect what the store wrote, or hand the same map to a
/// second store to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let entries = HashMap::from([(key.to_owned(), value.into())]);
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Synchronous read, for inspection outside the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if the lock is poisoned.
    pub fn peek(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.peek(key)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::Unavailable("memory storage lock poisoned".into()))?;
        entries.insert(key.to_owned(), value);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let storage = MemoryStorage::new();
        assert!(storage.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let storage = MemoryStorage::new();
        storage.set("k", b"one".to_vec()).await.unwrap();
        storage.set("k", b"two".to_vec()).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_clone_shares_entries() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(clone.peek("k").unwrap().unwrap(), b"v");
    }

    #[tokio::test]
    async fn test_with_entry() {
        let storage = MemoryStorage::with_entry("k", "[]");
        assert_eq!(storage.peek("k").unwrap().unwrap(), b"[]");
        assert_eq!(storage.get("k").await.unwrap().unwrap(), b"[]");

        storage.set("other", b"x".to_vec()).await.unwrap();
        assert_eq!(storage.peek("k").unwrap().unwrap(), b"[]");
    }
}
