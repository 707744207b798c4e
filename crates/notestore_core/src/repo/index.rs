//! Read-modify-write maintenance of the index document.
//!
//! # Responsibility
//! - Read, mutate and write back the ordered `ListNote` sequence.
//! - Optionally serialize those sequences inside one process.
//!
//! # Invariants
//! - A missing index blob is an empty index, not an error.
//! - New ids append at the tail; existing ids are updated in place.
//! - The first entry with a matching id wins if duplicates ever exist.
//! - `remove` writes only when an entry was actually removed.
//! - Under `Unserialized`, concurrent mutations race and the later write
//!   replaces the earlier one.

use super::error::{checkpoint, RepoError, RepoOp, RepoResult};
use crate::codec::{decode_index, encode_index};
use crate::context::OpContext;
use crate::model::note::{ListNote, Note};
use crate::store::BlobStore;
use log::debug;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Reserved blob key of the index document.
pub const DEFAULT_INDEX_KEY: &str = "index";

/// How index read-modify-write sequences are coordinated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexWritePolicy {
    /// No coordination; concurrent updates may be lost.
    #[default]
    Unserialized,
    /// One in-process mutex around each read-modify-write sequence.
    /// Does not coordinate separate processes sharing a store.
    SingleWriter,
}

impl IndexWritePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unserialized => "unserialized",
            Self::SingleWriter => "single_writer",
        }
    }
}

impl Display for IndexWritePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexWritePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unserialized" | "none" => Ok(Self::Unserialized),
            "single_writer" | "single-writer" | "locked" => Ok(Self::SingleWriter),
            other => Err(format!(
                "unsupported index write policy `{other}`; expected unserialized|single_writer"
            )),
        }
    }
}

/// Owner of the index document protocol.
#[derive(Debug)]
pub(crate) struct IndexMaintainer {
    key: String,
    policy: IndexWritePolicy,
    writer: Mutex<()>,
}

impl IndexMaintainer {
    pub(crate) fn new(key: impl Into<String>, policy: IndexWritePolicy) -> Self {
        Self {
            key: key.into(),
            policy,
            writer: Mutex::new(()),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn policy(&self) -> IndexWritePolicy {
        self.policy
    }

    /// Holds the writer lock for the caller's scope under `SingleWriter`.
    pub(crate) fn exclusive(&self) -> Option<MutexGuard<'_, ()>> {
        match self.policy {
            IndexWritePolicy::Unserialized => None,
            IndexWritePolicy::SingleWriter => Some(
                self.writer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            ),
        }
    }

    pub(crate) fn read<S: BlobStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OpContext,
    ) -> RepoResult<Vec<ListNote>> {
        checkpoint(ctx, RepoOp::ReadIndex)?;
        let bytes = match store.get(&self.key) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                debug!("event=index_read module=repo status=ok entries=0 reason=absent");
                return Ok(Vec::new());
            }
            Err(err) => return Err(RepoError::store(RepoOp::ReadIndex)(err)),
        };

        let entries = decode_index(&bytes).map_err(RepoError::encoding(RepoOp::ReadIndex))?;
        debug!(
            "event=index_read module=repo status=ok entries={} size={}",
            entries.len(),
            bytes.len()
        );
        Ok(entries)
    }

    pub(crate) fn write<S: BlobStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OpContext,
        entries: &[ListNote],
    ) -> RepoResult<()> {
        let bytes = encode_index(entries).map_err(RepoError::encoding(RepoOp::WriteIndex))?;
        checkpoint(ctx, RepoOp::WriteIndex)?;
        store
            .put(&self.key, &bytes)
            .map_err(RepoError::store(RepoOp::WriteIndex))?;
        debug!(
            "event=index_write module=repo status=ok entries={} size={}",
            entries.len(),
            bytes.len()
        );
        Ok(())
    }

    /// Inserts or refreshes the entry for `note`.
    pub(crate) fn upsert<S: BlobStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OpContext,
        note: &Note,
    ) -> RepoResult<()> {
        let _guard = self.exclusive();
        let mut entries = self.read(store, ctx)?;
        upsert_entry(&mut entries, note);
        self.write(store, ctx, &entries)
    }

    /// Drops the entry for `id`; returns whether one existed.
    pub(crate) fn remove<S: BlobStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OpContext,
        id: &str,
    ) -> RepoResult<bool> {
        let _guard = self.exclusive();
        let mut entries = self.read(store, ctx)?;
        if !remove_entry(&mut entries, id) {
            return Ok(false);
        }
        self.write(store, ctx, &entries)?;
        Ok(true)
    }
}

/// Returns `true` when a new entry was appended.
pub(crate) fn upsert_entry(entries: &mut Vec<ListNote>, note: &Note) -> bool {
    match entries.iter_mut().find(|entry| entry.id == note.id) {
        Some(entry) => {
            entry.title.clone_from(&note.title);
            entry.created = note.created;
            entry.updated = note.updated;
            false
        }
        None => {
            entries.push(note.to_list_note());
            true
        }
    }
}

/// Returns `true` when an entry was removed.
pub(crate) fn remove_entry(entries: &mut Vec<ListNote>, id: &str) -> bool {
    match entries.iter().position(|entry| entry.id == id) {
        Some(position) => {
            entries.remove(position);
            true
        }
        None => false,
    }
}
