//! Core of the note store: a list-capable document store built on a bare
//! key/blob store.
//! This crate is the single source of truth for repository invariants.

pub mod clock;
pub mod codec;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{decode_index, decode_note, encode_index, encode_note, CodecError};
pub use config::{BackendConfig, ConfigError, StoreConfig};
pub use context::{CancelToken, OpContext};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{ListNote, Note, NoteDraft, NoteId, Timestamp};
pub use repo::{
    BlobNoteRepository, IndexWritePolicy, NoteRepository, RepoError, RepoOp, RepoResult,
    DEFAULT_INDEX_KEY,
};
pub use service::note_service::{NoteService, NoteServiceError, NoteServiceResult};
pub use store::{
    Backend, BlobStore, FsBlobStore, HttpObjectClient, KeyEnumeration, MemoryBlobStore,
    ObjectClient, ObjectError, ObjectPage, S3BlobStore, S3Credentials, S3Settings,
    SqliteBlobStore, StoreError, StoreResult,
};

/// Minimal health-check API for front-end wiring checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
