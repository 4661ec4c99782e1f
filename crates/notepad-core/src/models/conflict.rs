//! Edit conflict model

use serde::{Deserialize, Serialize};

use super::note::{NoteId, Watermark};

/// A note that changed on the server after this session started editing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditConflict {
    pub note_id: NoteId,
    /// Watermark the session is editing against
    pub base_updated_at: Watermark,
    /// Watermark currently reported by the store
    pub remote_updated_at: Watermark,
}

/// User decision when an edit conflict blocks a save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Save anyway, last writer wins
    Overwrite,
    /// Create a new note with the local edits, leaving the remote note untouched
    Duplicate,
    /// Abort the save and stay dirty
    Cancel,
}

impl ConflictChoice {
    /// Parse a one-letter answer (`o`, `d`, `c`); anything else cancels.
    #[must_use]
    pub fn from_answer(answer: Option<&str>) -> Self {
        match answer.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("o" | "overwrite") => Self::Overwrite,
            Some("d" | "duplicate") => Self::Duplicate,
            _ => Self::Cancel,
        }
    }
}
