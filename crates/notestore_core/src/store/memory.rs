//! In-process blob store backed by a mutex-guarded map.

use super::{BlobStore, KeyEnumeration, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Ephemeral blob store. Used by tests and by the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, index document included.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> StoreResult<bool> {
        Ok(self.lock()?.contains_key(key))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

impl KeyEnumeration for MemoryBlobStore {
    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryBlobStore;
    use crate::store::{BlobStore, KeyEnumeration};

    #[test]
    fn get_missing_key_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(store.get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn put_overwrites_and_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.put("k", b"one").unwrap();
        store.put("k", b"two").unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn keys_are_sorted() {
        let store = MemoryBlobStore::new();
        store.put("b", b"").unwrap();
        store.put("a", b"").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
