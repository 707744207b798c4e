#![allow(dead_code)]

use notestore_core::{BlobStore, MemoryBlobStore, StoreError, StoreResult};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Put,
    Get,
    Delete,
}

type Hook = Box<dyn Fn(Call, &str) + Send + Sync>;

/// Memory store that records every call and fails on request.
pub struct RecordingStore {
    inner: MemoryBlobStore,
    calls: Mutex<Vec<(Call, String)>>,
    failures: Mutex<Vec<(Call, String)>>,
    after_call: Option<Hook>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            after_call: None,
        }
    }

    /// Runs `hook` after every successful call.
    pub fn with_hook(mut self, hook: impl Fn(Call, &str) + Send + Sync + 'static) -> Self {
        self.after_call = Some(Box::new(hook));
        self
    }

    /// Makes every future `call` on `key` fail with a backend error.
    pub fn fail(&self, call: Call, key: &str) {
        self.failures.lock().unwrap().push((call, key.to_string()));
    }

    pub fn heal(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<(Call, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, call: Call, key: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(c, k)| *c == call && k == key)
            .count()
    }

    pub fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }

    fn enter(&self, call: Call, key: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push((call, key.to_string()));
        let failing = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(c, k)| *c == call && k == key);
        if failing {
            return Err(StoreError::Backend(format!("injected {call:?} failure for {key}")));
        }
        Ok(())
    }

    fn leave(&self, call: Call, key: &str) {
        if let Some(hook) = &self.after_call {
            hook(call, key);
        }
    }
}

impl BlobStore for RecordingStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.enter(Call::Put, key)?;
        self.inner.put(key, bytes)?;
        self.leave(Call::Put, key);
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.enter(Call::Get, key)?;
        let bytes = self.inner.get(key)?;
        self.leave(Call::Get, key);
        Ok(bytes)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.enter(Call::Delete, key)?;
        self.inner.delete(key)?;
        self.leave(Call::Delete, key);
        Ok(())
    }
}
