//! Blob-store capability and its concrete backends.
//!
//! # Responsibility
//! - Define the narrow `put/get/delete` contract the repository builds on.
//! - Provide interchangeable backends selected at construction time.
//!
//! # Invariants
//! - `get` on an absent key returns `StoreError::NotFound`, never empty bytes.
//! - `delete` on an absent key succeeds.
//! - Backends never retry; every failure is reported to the caller once.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod backend;
mod filesystem;
mod memory;
mod s3;
mod sqlite;

pub use backend::Backend;
pub use filesystem::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::{
    HttpObjectClient, ObjectClient, ObjectError, ObjectPage, S3BlobStore, S3Credentials, S3Settings,
    NO_SUCH_KEY,
};
pub use sqlite::SqliteBlobStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a blob-store backend.
#[derive(Debug)]
pub enum StoreError {
    /// Requested key is absent.
    NotFound(String),
    /// Filesystem failure.
    Io(std::io::Error),
    /// SQLite failure.
    Db(DbError),
    /// Any other backend failure (network, permissions, throttling).
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "blob not found: {key}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "blob store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Backend(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-addressed byte storage with no listing or query capability.
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;
    /// Reads the bytes stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;
    /// Removes `key`. Absent keys are not an error.
    fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Optional capability: enumerate every stored key.
///
/// Only needed by index rebuilds; the regular repository path never lists.
pub trait KeyEnumeration: BlobStore {
    fn keys(&self) -> StoreResult<Vec<String>>;
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        (**self).put(key, bytes)
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }
}

impl<S: KeyEnumeration + ?Sized> KeyEnumeration for Arc<S> {
    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}
