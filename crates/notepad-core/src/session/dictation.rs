//! Speech-to-text capability

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Platform speech recognition; results come back through the session's
/// `on_dictation_*` entry points.
pub trait Dictation: Send + Sync + 'static {
    fn start(&self) -> Result<()>;
    fn stop(&self);
}

/// One recognition segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Dictation state shown next to the editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictationStatus {
    pub listening: bool,
    pub interim: String,
    /// Inline notice for the last capability error
    pub error: Option<String>,
}

/// Concatenate final and interim transcripts separately.
pub fn split_results(results: &[RecognitionResult]) -> (String, String) {
    results
        .iter()
        .fold((String::new(), String::new()), |(mut finals, mut interim), result| {
            if result.is_final {
                finals.push_str(&result.transcript);
            } else {
                interim.push_str(&result.transcript);
            }
            (finals, interim)
        })
}

/// Append recognized text to the content, separated by one space.
pub fn append_transcript(content: &mut String, text: &str) {
    if !content.is_empty() {
        content.push(' ');
    }
    content.push_str(text);
}
