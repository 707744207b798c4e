//! Closed set of backends selectable from configuration.

use super::{
    BlobStore, FsBlobStore, KeyEnumeration, MemoryBlobStore, S3BlobStore, SqliteBlobStore,
    StoreResult,
};

/// Concrete backend chosen once at startup.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryBlobStore),
    Filesystem(FsBlobStore),
    Sqlite(SqliteBlobStore),
    S3(S3BlobStore),
}

impl Backend {
    /// Short backend name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Filesystem(_) => "fs",
            Self::Sqlite(_) => "sqlite",
            Self::S3(_) => "s3",
        }
    }

    fn store(&self) -> &dyn KeyEnumeration {
        match self {
            Self::Memory(store) => store,
            Self::Filesystem(store) => store,
            Self::Sqlite(store) => store,
            Self::S3(store) => store,
        }
    }
}

impl BlobStore for Backend {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.store().put(key, bytes)
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.store().get(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.store().delete(key)
    }
}

impl KeyEnumeration for Backend {
    fn keys(&self) -> StoreResult<Vec<String>> {
        self.store().keys()
    }
}
