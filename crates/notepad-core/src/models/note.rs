//! Note model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned numeric note identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    /// Wrap a raw identifier
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Opaque server timestamp.
///
/// Only compared for equality: `updated_at` is the watermark that detects
/// concurrent remote modification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(String);

impl Watermark {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note as returned by the note service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier
    pub id: NoteId,
    /// Optional title; empty or absent means "derive from content"
    #[serde(default)]
    pub title: Option<String>,
    /// Plain text body
    #[serde(default)]
    pub content: String,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<Watermark>,
    /// Last update timestamp, used as the conflict watermark
    #[serde(default)]
    pub updated_at: Option<Watermark>,
    /// Public share token, present once the note has been shared
    #[serde(default)]
    pub share_id: Option<String>,
}

impl Note {
    /// Title to show in lists: the stored title, else the first content line
    #[must_use]
    pub fn display_title(&self, max_len: usize) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.chars().take(max_len).collect(),
            _ => self
                .content
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("")
                .chars()
                .take(max_len)
                .collect(),
        }
    }

    /// Check if note content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Body for creating a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: Option<String>,
    pub content: String,
}

/// Partial update body; `None` fields are sent as `null`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Response of the share endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareToken {
    pub share_id: String,
}
