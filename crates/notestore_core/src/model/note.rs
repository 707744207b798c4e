//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical `Note` record and its `ListNote` projection.
//! - Provide the draft type accepted by the service layer.
//!
//! # Invariants
//! - `id` is stable and never changes after the first save.
//! - `created` is set once; `updated` is refreshed on every save.
//! - A `ListNote` never carries the note body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of a note, also used verbatim as its blob-store key.
pub type NoteId = String;

/// Timestamp type shared by notes and index entries (RFC 3339 on the wire).
pub type Timestamp = DateTime<Utc>;

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable id. Doubles as the blob key.
    pub id: NoteId,
    /// Human-readable title, also projected into the index.
    #[serde(default)]
    pub title: String,
    /// Note body. Only stored in the note blob.
    #[serde(default)]
    pub data: String,
    /// First-save timestamp.
    pub created: Timestamp,
    /// Last-save timestamp.
    pub updated: Timestamp,
}

impl Note {
    /// Builds a note whose `created` and `updated` are both `at`.
    pub fn new(
        id: impl Into<NoteId>,
        title: impl Into<String>,
        data: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            data: data.into(),
            created: at,
            updated: at,
        }
    }

    /// Returns the index projection of this note.
    pub fn to_list_note(&self) -> ListNote {
        ListNote {
            id: self.id.clone(),
            title: self.title.clone(),
            created: self.created,
            updated: self.updated,
        }
    }
}

/// Read projection of a note kept in the index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNote {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    pub created: Timestamp,
    pub updated: Timestamp,
}

impl From<&Note> for ListNote {
    fn from(value: &Note) -> Self {
        value.to_list_note()
    }
}

/// Caller input for creating or overwriting a note.
///
/// Timestamps are not part of the draft; the service assigns them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: String,
}

impl NoteDraft {
    /// Creates a draft with a freshly generated id.
    pub fn new(title: impl Into<String>, data: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, data)
    }

    /// Creates a draft for a caller-provided id.
    ///
    /// Used when the id already exists externally, or to overwrite a note.
    pub fn with_id(
        id: impl Into<NoteId>,
        title: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            data: data.into(),
        }
    }
}
