//! Save payload construction

use crate::util::blank_to_none;

use super::state::{EditBuffer, SavedSnapshot};

/// Maximum length of a title derived from content
pub const INFERRED_TITLE_MAX_CHARS: usize = 60;

/// What a save would send to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePayload {
    pub title: Option<String>,
    pub content: String,
    /// The title was derived from the first content line
    pub title_inferred: bool,
}

impl SavePayload {
    /// Same title/content as `saved`, so sending it would be a no-op.
    pub fn matches(&self, saved: &SavedSnapshot) -> bool {
        blank_to_none(self.title.as_deref()) == saved.title && self.content == saved.content
    }
}

/// First non-blank line of `content`, trimmed and cut to 60 characters.
pub fn infer_title(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(INFERRED_TITLE_MAX_CHARS).collect())
}

/// Build the payload for the current buffer.
///
/// An empty title field is filled from the content only while the note has
/// never had a title; otherwise the field is sent as-is, blank as `None`.
pub fn build_payload(buffer: &EditBuffer, last_saved: &SavedSnapshot) -> SavePayload {
    let title_field_empty = buffer.title.trim().is_empty();
    if title_field_empty && last_saved.title.is_none() {
        let title = infer_title(&buffer.content);
        return SavePayload {
            title_inferred: title.is_some(),
            title,
            content: buffer.content.clone(),
        };
    }

    SavePayload {
        title: blank_to_none(Some(buffer.title.as_str())),
        content: buffer.content.clone(),
        title_inferred: false,
    }
}
