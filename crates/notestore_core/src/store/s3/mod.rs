//! Object-storage blob store for S3-compatible services.
//!
//! # Responsibility
//! - Map blob-store calls onto object put/get/delete/list in one bucket.
//! - Translate the service's `NoSuchKey` answer into `StoreError::NotFound`.
//!
//! # Invariants
//! - Keys are used verbatim as object keys.
//! - One object call per blob-store call (listing pages aside); no retries.
//! - Deleting an absent object succeeds.

use super::{BlobStore, KeyEnumeration, StoreError, StoreResult};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod http;
mod sigv4;

pub use http::{HttpObjectClient, S3Credentials, S3Settings};

/// Error code object stores return for an absent key.
pub const NO_SUCH_KEY: &str = "NoSuchKey";

/// Failure reported by an object-storage client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectError {
    /// Service error code (`NoSuchKey`, `AccessDenied`, ...) or a local code
    /// such as `RequestFailed` when no response arrived.
    pub code: String,
    pub message: String,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
}

impl ObjectError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn no_such_key(key: &str) -> Self {
        Self {
            code: NO_SUCH_KEY.to_string(),
            message: format!("the specified key does not exist: {key}"),
            status: Some(404),
        }
    }

    pub fn is_no_such_key(&self) -> bool {
        self.code == NO_SUCH_KEY
    }
}

impl Display for ObjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status}): {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl Error for ObjectError {}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// Minimal object-storage API the store needs.
///
/// Implemented over HTTP by [`HttpObjectClient`]; tests substitute fakes.
pub trait ObjectClient: Send + Sync {
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), ObjectError>;
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectError>;
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectError>;
    fn list_objects(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, ObjectError>;
}

/// Blob store keeping every key as an object in `bucket`.
#[derive(Debug)]
pub struct S3BlobStore<C = HttpObjectClient> {
    client: C,
    bucket: String,
}

impl S3BlobStore<HttpObjectClient> {
    /// Builds the HTTP client for `settings`. No request is sent.
    pub fn connect(settings: &S3Settings) -> StoreResult<Self> {
        let client = HttpObjectClient::new(settings)?;
        Ok(Self::new(client, settings.bucket.clone()))
    }
}

impl<C: ObjectClient> S3BlobStore<C> {
    pub fn new(client: C, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn failure(&self, action: &str, key: &str, err: ObjectError) -> StoreError {
        StoreError::Backend(format!("s3 {action} {}/{key}: {err}", self.bucket))
    }
}

impl<C: ObjectClient> BlobStore for S3BlobStore<C> {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.client
            .put_object(&self.bucket, key, bytes)
            .map_err(|err| self.failure("put", key, err))
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        match self.client.get_object(&self.bucket, key) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.is_no_such_key() => Err(StoreError::NotFound(key.to_string())),
            Err(err) => Err(self.failure("get", key, err)),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match self.client.delete_object(&self.bucket, key) {
            Ok(()) => Ok(()),
            Err(err) if err.is_no_such_key() => Ok(()),
            Err(err) => Err(self.failure("delete", key, err)),
        }
    }
}

impl<C: ObjectClient> KeyEnumeration for S3BlobStore<C> {
    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page = self
                .client
                .list_objects(&self.bucket, continuation.as_deref())
                .map_err(|err| {
                    StoreError::Backend(format!("s3 list {}: {err}", self.bucket))
                })?;
            debug!(
                "event=store_keys module=store backend=s3 status=page keys={}",
                page.keys.len()
            );
            keys.extend(page.keys);
            match page.next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        keys.sort();
        Ok(keys)
    }
}
