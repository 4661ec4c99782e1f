//! Note store contract and implementations
//!
//! The note service owns notes; this module describes what the client needs
//! from it and provides an HTTP client plus an in-process implementation.

mod http;
mod memory;

use std::future::Future;

use crate::error::Result;
use crate::models::{NewNote, Note, NoteId, NotePatch, ShareToken};

pub use http::HttpNoteStore;
pub use memory::{CallCounts, MemoryNoteStore};

/// Remote CRUD and share operations over notes
pub trait NoteStore: Send + Sync + 'static {
    /// List all notes; ordering is unspecified
    fn list(&self) -> impl Future<Output = Result<Vec<Note>>> + Send;

    /// Create a note; the store assigns the id and timestamps
    fn create(&self, note: &NewNote) -> impl Future<Output = Result<Note>> + Send;

    /// Fetch a single note, `Error::NotFound` when absent
    fn get(&self, id: NoteId) -> impl Future<Output = Result<Note>> + Send;

    /// Partially update a note and return it with a refreshed `updated_at`
    fn patch(&self, id: NoteId, patch: &NotePatch) -> impl Future<Output = Result<Note>> + Send;

    /// Delete a note
    fn delete(&self, id: NoteId) -> impl Future<Output = Result<()>> + Send;

    /// Publish a note; repeated calls return a usable token
    fn share(&self, id: NoteId) -> impl Future<Output = Result<ShareToken>> + Send;

    /// Fetch the read-only projection of a shared note
    fn get_shared(&self, share_id: &str) -> impl Future<Output = Result<Note>> + Send;
}

/// Sort notes newest first by `updated_at`, falling back to id
pub fn sort_recent_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .as_ref()
            .map(crate::models::Watermark::as_str)
            .cmp(&a.updated_at.as_ref().map(crate::models::Watermark::as_str))
            .then_with(|| b.id.cmp(&a.id))
    });
}
