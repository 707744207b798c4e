//! Domain model for stored notes and their list projections.
//!
//! # Responsibility
//! - Define the note record persisted as one blob per id.
//! - Define the body-less projection kept inside the index document.
//!
//! # Invariants
//! - Every note is identified by a stable, non-empty string id.
//! - `ListNote` values only ever live inside the index document.

pub mod note;
