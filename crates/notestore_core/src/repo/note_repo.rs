//! Note repository contract and its blob-store implementation.
//!
//! # Responsibility
//! - Provide note persistence on top of any `BlobStore`.
//! - Keep the index document in step with note blobs on save/delete.
//!
//! # Invariants
//! - A note is stored under its own id; the index under the reserved key.
//! - `save` writes the blob before the index; `delete` removes the blob
//!   before the index. A failure in the second step leaves the first in
//!   place and is reported to the caller.
//! - `list` never returns an entry whose id is the reserved index key.

use super::error::{checkpoint, RepoError, RepoOp, RepoResult};
use super::index::{IndexMaintainer, IndexWritePolicy, DEFAULT_INDEX_KEY};
use crate::codec::{decode_note, encode_note};
use crate::context::OpContext;
use crate::model::note::{ListNote, Note};
use crate::store::{BlobStore, KeyEnumeration};
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Repository interface consumed by the service layer.
pub trait NoteRepository {
    /// Writes the note blob, then inserts or refreshes its index entry.
    fn save(&self, ctx: &OpContext, note: &Note) -> RepoResult<()>;
    /// Gets one note by id. Missing blobs yield `RepoError::NotFound`.
    fn get(&self, ctx: &OpContext, id: &str) -> RepoResult<Note>;
    /// Removes the note blob, then its index entry.
    fn delete(&self, ctx: &OpContext, id: &str) -> RepoResult<()>;
    /// Returns every index entry in insertion order.
    ///
    /// `start` and `end` are accepted for interface compatibility but are
    /// not applied; the whole index is always returned.
    fn list(&self, ctx: &OpContext, start: usize, end: usize) -> RepoResult<Vec<ListNote>>;
}

impl<R: NoteRepository + ?Sized> NoteRepository for Arc<R> {
    fn save(&self, ctx: &OpContext, note: &Note) -> RepoResult<()> {
        (**self).save(ctx, note)
    }

    fn get(&self, ctx: &OpContext, id: &str) -> RepoResult<Note> {
        (**self).get(ctx, id)
    }

    fn delete(&self, ctx: &OpContext, id: &str) -> RepoResult<()> {
        (**self).delete(ctx, id)
    }

    fn list(&self, ctx: &OpContext, start: usize, end: usize) -> RepoResult<Vec<ListNote>> {
        (**self).list(ctx, start, end)
    }
}

/// Note repository over a key/blob store plus a hand-maintained index.
#[derive(Debug)]
pub struct BlobNoteRepository<S> {
    store: S,
    index: IndexMaintainer,
}

impl<S: BlobStore> BlobNoteRepository<S> {
    /// Repository using the default index key and no index coordination.
    pub fn new(store: S) -> Self {
        Self::with_index(store, DEFAULT_INDEX_KEY, IndexWritePolicy::default())
    }

    /// Repository with an explicit index key and write policy.
    ///
    /// The key must never be used as a note id; callers enforce that.
    pub fn with_index(store: S, index_key: impl Into<String>, policy: IndexWritePolicy) -> Self {
        let index = IndexMaintainer::new(index_key, policy);
        info!(
            "event=repo_init module=repo status=ok index_key={} index_writes={}",
            index.key(),
            index.policy()
        );
        Self { store, index }
    }

    pub fn index_key(&self) -> &str {
        self.index.key()
    }

    pub fn index_write_policy(&self) -> IndexWritePolicy {
        self.index.policy()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S: KeyEnumeration> BlobNoteRepository<S> {
    /// Rebuilds the index document from the note blobs themselves.
    ///
    /// This is a repair path for stores that can enumerate keys; it replaces
    /// whatever the index held. Entries are ordered by `(created, id)` since
    /// the original insertion order is not recoverable from the blobs.
    /// Returns the number of indexed notes.
    pub fn rebuild_index(&self, ctx: &OpContext) -> RepoResult<usize> {
        let started_at = Instant::now();
        let _guard = self.index.exclusive();

        checkpoint(ctx, RepoOp::ListKeys)?;
        let keys = self.store.keys().map_err(RepoError::store(RepoOp::ListKeys))?;

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|key| key.as_str() != self.index.key()) {
            checkpoint(ctx, RepoOp::GetNote)?;
            let bytes = match self.store.get(key) {
                Ok(bytes) => bytes,
                // Deleted between listing and reading.
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(RepoError::store(RepoOp::GetNote)(err)),
            };
            let note = decode_note(&bytes).map_err(RepoError::encoding(RepoOp::GetNote))?;
            entries.push(note.to_list_note());
        }
        entries.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

        self.index.write(&self.store, ctx, &entries)?;
        info!(
            "event=index_rebuild module=repo status=ok entries={} duration_ms={}",
            entries.len(),
            started_at.elapsed().as_millis()
        );
        Ok(entries.len())
    }
}

impl<S: BlobStore> NoteRepository for BlobNoteRepository<S> {
    fn save(&self, ctx: &OpContext, note: &Note) -> RepoResult<()> {
        let bytes = encode_note(note).map_err(RepoError::encoding(RepoOp::PutNote))?;
        checkpoint(ctx, RepoOp::PutNote)?;
        self.store
            .put(&note.id, &bytes)
            .map_err(RepoError::store(RepoOp::PutNote))?;
        info!(
            "event=note_put module=repo status=ok id={} size={}",
            note.id,
            bytes.len()
        );

        // The blob stays written if the index step fails.
        if let Err(err) = self.index.upsert(&self.store, ctx, note) {
            warn!(
                "event=note_save module=repo status=partial id={} stage=index error={}",
                note.id, err
            );
            return Err(err);
        }
        Ok(())
    }

    fn get(&self, ctx: &OpContext, id: &str) -> RepoResult<Note> {
        checkpoint(ctx, RepoOp::GetNote)?;
        let bytes = match self.store.get(id) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => return Err(RepoError::NotFound(id.to_string())),
            Err(err) => return Err(RepoError::store(RepoOp::GetNote)(err)),
        };
        info!(
            "event=note_get module=repo status=ok id={} size={}",
            id,
            bytes.len()
        );
        decode_note(&bytes).map_err(RepoError::encoding(RepoOp::GetNote))
    }

    fn delete(&self, ctx: &OpContext, id: &str) -> RepoResult<()> {
        checkpoint(ctx, RepoOp::DeleteNote)?;
        self.store
            .delete(id)
            .map_err(RepoError::store(RepoOp::DeleteNote))?;

        match self.index.remove(&self.store, ctx, id) {
            Ok(removed) => {
                info!(
                    "event=note_delete module=repo status=ok id={id} index_entry_removed={removed}"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=note_delete module=repo status=partial id={id} stage=index error={err}"
                );
                Err(err)
            }
        }
    }

    fn list(&self, ctx: &OpContext, _start: usize, _end: usize) -> RepoResult<Vec<ListNote>> {
        let mut entries = self.index.read(&self.store, ctx)?;
        entries.retain(|entry| entry.id != self.index.key());
        Ok(entries)
    }
}
