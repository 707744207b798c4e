//! Document-store repository built on a bare blob store.
//!
//! # Responsibility
//! - Expose save/get/delete/list over notes stored one blob per id.
//! - Maintain the reserved index document that emulates "list all".
//!
//! # Invariants
//! - Writes are two independent steps (blob, then index); there is no
//!   rollback when the second step fails.
//! - A missing index document reads as an empty index.
//! - Index entries keep insertion order and unique ids.

mod error;
pub mod index;
pub mod note_repo;

pub use error::{RepoError, RepoOp, RepoResult};
pub use index::{IndexWritePolicy, DEFAULT_INDEX_KEY};
pub use note_repo::{BlobNoteRepository, NoteRepository};
