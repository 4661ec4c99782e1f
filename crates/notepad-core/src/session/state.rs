//! Save state machine and edit buffer types

use serde::{Deserialize, Serialize};

use crate::models::Note;
use crate::util::blank_to_none;

/// Persistence state of an editor session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    #[default]
    Idle,
    Dirty,
    Saving,
    Saved,
    Error,
}

impl SaveState {
    /// Unsynced edits may exist beyond what the draft cache holds.
    pub const fn blocks_unload(self) -> bool {
        matches!(self, Self::Dirty | Self::Saving)
    }

    /// Short status text for the editor toolbar.
    pub const fn label(self, online: bool) -> &'static str {
        if !online {
            return "Offline (draft saved)";
        }
        match self {
            Self::Idle => "",
            Self::Dirty => "Unsaved",
            Self::Saving => "Saving…",
            Self::Saved => "Saved",
            Self::Error => "Save failed (draft saved)",
        }
    }
}

/// Title/content pair known to be persisted server-side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedSnapshot {
    pub title: Option<String>,
    pub content: String,
}

impl SavedSnapshot {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: blank_to_none(note.title.as_deref()),
            content: note.content.clone(),
        }
    }
}

/// Live edit buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    pub title: String,
    pub content: String,
}

impl EditBuffer {
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone().unwrap_or_default(),
            content: note.content.clone(),
        }
    }

    /// Buffer as it compares against `SavedSnapshot`: blank title is `None`.
    pub fn normalized(&self) -> SavedSnapshot {
        SavedSnapshot {
            title: blank_to_none(Some(self.title.as_str())),
            content: self.content.clone(),
        }
    }
}
