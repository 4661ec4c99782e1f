//! Data models for Notepad

mod conflict;
mod draft;
mod note;

pub use conflict::{ConflictChoice, EditConflict};
pub use draft::{draft_key, note_id_from_draft_key, Draft, DRAFT_KEY_PREFIX};
pub use note::{NewNote, Note, NoteId, NotePatch, ShareToken, Watermark};
