//! Locally persisted draft model

use serde::{Deserialize, Serialize};

use super::note::{NoteId, Watermark};

/// Namespace and schema version of draft keys
pub const DRAFT_KEY_PREFIX: &str = "notepad:draft:v1";

/// Possibly-unsynced edit snapshot for one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Client timestamp of the last local write (Unix ms)
    pub ts: i64,
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Note `updated_at` at the time editing began
    #[serde(rename = "baseUpdatedAt", default)]
    pub base_updated_at: Option<Watermark>,
}

/// Storage key of the draft for `id`
#[must_use]
pub fn draft_key(id: NoteId) -> String {
    format!("{DRAFT_KEY_PREFIX}:{id}")
}

/// Note id encoded in a draft key, if `key` is one
#[must_use]
pub fn note_id_from_draft_key(key: &str) -> Option<NoteId> {
    key.strip_prefix(DRAFT_KEY_PREFIX)?
        .strip_prefix(':')?
        .parse()
        .ok()
}
