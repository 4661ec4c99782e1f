//! notepad-core - Core library for Notepad
//!
//! This crate contains the note models, the note store client, local draft
//! persistence and the editor session that ties them together. Interfaces
//! (currently the CLI) drive an `EditorSession` and render its state.

pub mod config;
pub mod drafts;
pub mod error;
pub mod models;
pub mod session;
pub mod store;
pub mod util;

pub use config::ClientConfig;
pub use drafts::{DraftCache, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use error::{Error, Result};
pub use models::{ConflictChoice, Draft, EditConflict, NewNote, Note, NoteId, NotePatch};
pub use session::{EditorSession, Prompter, SaveOutcome, SaveState, SessionSettings};
pub use store::{HttpNoteStore, MemoryNoteStore, NoteStore};
