//! Note use-case service.
//!
//! # Responsibility
//! - Provide create/get/delete/list APIs over a `NoteRepository`.
//! - Own timestamp assignment and input validation.
//!
//! # Invariants
//! - Note ids are non-empty and never equal the reserved index key.
//! - `created` is preserved across saves of the same id; `updated` is set on
//!   every save. An unreadable existing blob is overwritten as a new note.

use crate::clock::Clock;
use crate::context::OpContext;
use crate::model::note::{ListNote, Note, NoteDraft, NoteId};
use crate::repo::{NoteRepository, RepoError, DEFAULT_INDEX_KEY};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Input rejected before any store call.
    InvalidNote(String),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl NoteServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoteNotFound(_))
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNote(reason) => write!(f, "invalid note: {reason}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository, C: Clock> {
    repo: R,
    clock: C,
    index_key: String,
}

impl<R: NoteRepository, C: Clock> NoteService<R, C> {
    /// Creates a service that reserves the default index key.
    pub fn new(repo: R, clock: C) -> Self {
        Self::with_index_key(repo, clock, DEFAULT_INDEX_KEY)
    }

    /// Creates a service whose repository stores its index under `index_key`.
    pub fn with_index_key(repo: R, clock: C, index_key: impl Into<String>) -> Self {
        Self {
            repo,
            clock,
            index_key: index_key.into(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Saves a draft as a new note or as an overwrite of an existing one.
    ///
    /// An existing note's `created` is carried over; otherwise `created`
    /// and `updated` are both set to the current clock value.
    pub fn create(&self, ctx: &OpContext, draft: NoteDraft) -> NoteServiceResult<Note> {
        self.validate(&draft)?;
        info!("event=note_create module=service status=start id={}", draft.id);

        let now = self.clock.now();
        let created = match self.repo.get(ctx, &draft.id) {
            Ok(existing) => existing.created,
            Err(RepoError::NotFound(_)) => now,
            Err(err @ RepoError::Encoding { .. }) => {
                warn!(
                    "event=note_create module=service status=overwrite id={} error={err}",
                    draft.id
                );
                now
            }
            Err(err) => return Err(err.into()),
        };

        let note = Note {
            id: draft.id,
            title: draft.title,
            data: draft.data,
            created,
            updated: now,
        };
        self.repo.save(ctx, &note)?;
        info!("event=note_create module=service status=ok id={}", note.id);
        Ok(note)
    }

    /// Gets one note by id.
    pub fn get(&self, ctx: &OpContext, id: &str) -> NoteServiceResult<Note> {
        info!("event=note_get module=service status=start id={id}");
        Ok(self.repo.get(ctx, id)?)
    }

    /// Deletes one note. Unknown ids are a successful no-op.
    pub fn delete(&self, ctx: &OpContext, id: &str) -> NoteServiceResult<()> {
        info!("event=note_delete module=service status=start id={id}");
        Ok(self.repo.delete(ctx, id)?)
    }

    /// Lists every note projection in insertion order.
    pub fn list(
        &self,
        ctx: &OpContext,
        start: usize,
        end: usize,
    ) -> NoteServiceResult<Vec<ListNote>> {
        info!("event=note_list module=service status=start");
        let items = self.repo.list(ctx, start, end)?;
        info!(
            "event=note_list module=service status=ok items={}",
            items.len()
        );
        Ok(items)
    }

    fn validate(&self, draft: &NoteDraft) -> NoteServiceResult<()> {
        if draft.id.trim().is_empty() {
            return Err(NoteServiceError::InvalidNote("id must not be empty".to_string()));
        }
        if draft.id == self.index_key {
            return Err(NoteServiceError::InvalidNote(format!(
                "id `{}` is reserved",
                draft.id
            )));
        }
        if draft.data.is_empty() {
            return Err(NoteServiceError::InvalidNote("data must not be empty".to_string()));
        }
        Ok(())
    }
}
