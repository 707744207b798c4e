//! Byte encoding for note blobs and the index document.
//!
//! # Responsibility
//! - Serialize one `Note` and one ordered `ListNote` sequence to JSON bytes.
//! - Reject structurally invalid blobs instead of masking them.
//!
//! # Invariants
//! - `decode_*(encode_*(x)) == x` for every value, including empty indexes.
//! - Unknown fields are ignored on decode.
//! - Timestamps are written as RFC 3339 text.

use crate::model::note::{ListNote, Note};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

/// Encoding failure for note or index documents.
#[derive(Debug)]
pub struct CodecError(serde_json::Error);

impl CodecError {
    /// Returns `true` when the input bytes were not valid JSON at all.
    pub fn is_syntax(&self) -> bool {
        self.0.is_syntax() || self.0.is_eof()
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed document: {}", self.0)
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self(value)
    }
}

/// Encodes one note blob.
pub fn encode_note(note: &Note) -> CodecResult<Vec<u8>> {
    Ok(serde_json::to_vec(note)?)
}

/// Decodes one note blob.
pub fn decode_note(bytes: &[u8]) -> CodecResult<Note> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes the ordered index sequence.
pub fn encode_index(entries: &[ListNote]) -> CodecResult<Vec<u8>> {
    Ok(serde_json::to_vec(entries)?)
}

/// Decodes the ordered index sequence.
pub fn decode_index(bytes: &[u8]) -> CodecResult<Vec<ListNote>> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::{decode_index, decode_note, encode_index, encode_note};
    use crate::model::note::{ListNote, Note};
    use chrono::{TimeZone, Utc};

    fn sample_note() -> Note {
        let created = Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap();
        let mut note = Note::new("n-1", "Groceries", "eggs\nmilk", created);
        note.updated = Utc.with_ymd_and_hms(2023, 5, 7, 7, 8, 9).unwrap();
        note
    }

    #[test]
    fn note_roundtrip_preserves_every_field() {
        let note = sample_note();
        let decoded = decode_note(&encode_note(&note).unwrap()).unwrap();
        assert_eq!(decoded, note);
    }

    #[test]
    fn index_roundtrip_preserves_order_and_handles_empty() {
        let first = sample_note().to_list_note();
        let mut second = first.clone();
        second.id = "n-0".to_string();
        let entries = vec![first, second];

        let decoded = decode_index(&encode_index(&entries).unwrap()).unwrap();
        assert_eq!(decoded, entries);

        let empty: Vec<ListNote> = Vec::new();
        assert_eq!(decode_index(&encode_index(&empty).unwrap()).unwrap(), empty);
    }

    #[test]
    fn encoded_note_uses_wire_field_names_and_rfc3339_timestamps() {
        let bytes = encode_note(&sample_note()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["id"], "n-1");
        assert_eq!(value["title"], "Groceries");
        assert_eq!(value["data"], "eggs\nmilk");
        assert_eq!(value["created"], "2023-05-06T07:08:09Z");
        assert_eq!(value["updated"], "2023-05-07T07:08:09Z");
    }

    #[test]
    fn encoded_index_entries_omit_body() {
        let bytes = encode_index(&[sample_note().to_list_note()]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value[0].get("data").is_none());
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let raw = concat!(
            r#"{"id":"1","title":"T","data":"D","created":"2024-01-01T00:00:00Z","#,
            r#""updated":"2024-01-01T00:00:00Z","tags":["x"]}"#
        );
        let note = decode_note(raw.as_bytes()).unwrap();
        assert_eq!(note.id, "1");
        assert_eq!(note.data, "D");
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let err = decode_note(b"{not json").unwrap_err();
        assert!(err.is_syntax());

        let err = decode_index(br#"{"id":"1"}"#).unwrap_err();
        assert!(!err.is_syntax());

        let missing_id = concat!(
            r#"{"title":"no id","created":"2024-01-01T00:00:00Z","#,
            r#""updated":"2024-01-01T00:00:00Z"}"#
        );
        let err = decode_note(missing_id.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("id"));

        let bad_timestamp = br#"{"id":"1","created":"yesterday","updated":"2024-01-01T00:00:00Z"}"#;
        assert!(decode_note(bad_timestamp).is_err());
    }
}
