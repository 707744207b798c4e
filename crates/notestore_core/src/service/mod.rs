//! Note use-case service.
//!
//! # Responsibility
//! - Validate caller input before it reaches the repository.
//! - Assign `created`/`updated` timestamps through an injected `Clock`.
//! - Keep front ends decoupled from storage details.

pub mod note_service;
