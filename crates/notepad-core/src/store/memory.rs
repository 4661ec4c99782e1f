//! In-process note store.
//!
//! Mirrors the note service contract closely enough to drive editor sessions
//! without a server: ids are assigned sequentially, `updated_at` strictly
//! increases on every write, `null` patch fields leave values untouched and
//! sharing is idempotent.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{NewNote, Note, NoteId, NotePatch, ShareToken, Watermark};

use super::NoteStore;

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 50_000;

/// Number of calls per store operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub create: usize,
    pub get: usize,
    pub patch: usize,
    pub delete: usize,
    pub share: usize,
    pub get_shared: usize,
}

#[derive(Default)]
struct MemoryState {
    notes: BTreeMap<NoteId, Note>,
    last_id: i64,
    last_micros: i64,
    calls: CallCounts,
    unreachable: bool,
    fail_next_patch: Option<String>,
    fail_next_get: Option<String>,
    share_touches_note: bool,
    latency: Option<Duration>,
}

impl MemoryState {
    fn next_watermark(&mut self) -> Watermark {
        let now = chrono::Utc::now().timestamp_micros();
        self.last_micros = now.max(self.last_micros + 1);
        let rendered = DateTime::from_timestamp_micros(self.last_micros).map_or_else(
            || self.last_micros.to_string(),
            |date_time| date_time.to_rfc3339_opts(SecondsFormat::Micros, true),
        );
        Watermark::new(rendered)
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable {
            Err(Error::Api {
                status: 503,
                message: "note service unreachable".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn note_mut(&mut self, id: NoteId) -> Result<&mut Note> {
        self.notes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

/// Thread-safe in-memory `NoteStore`; clones share the same notes
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a note directly, bypassing call accounting.
    pub fn seed(&self, title: Option<&str>, content: &str) -> Note {
        let mut state = self.state.lock();
        insert_note(&mut state, title.map(ToString::to_string), content.to_string())
    }

    /// Edit a note as another client would, advancing its watermark.
    pub fn edit_remotely(&self, id: NoteId, content: &str) -> Result<Note> {
        let mut state = self.state.lock();
        let updated_at = state.next_watermark();
        let note = state.note_mut(id)?;
        note.content = content.to_string();
        note.updated_at = Some(updated_at);
        Ok(note.clone())
    }

    /// Current stored copy of a note, if any.
    pub fn snapshot(&self, id: NoteId) -> Option<Note> {
        self.state.lock().notes.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Make every operation fail as if the service could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Fail the next patch with a server error carrying `message`.
    pub fn fail_next_patch(&self, message: impl Into<String>) {
        self.state.lock().fail_next_patch = Some(message.into());
    }

    /// Fail the next get with a server error carrying `message`.
    pub fn fail_next_get(&self, message: impl Into<String>) {
        self.state.lock().fail_next_get = Some(message.into());
    }

    /// Advance `updated_at` whenever a note is shared, like services that
    /// store the share token on the note row.
    pub fn set_share_touches_note(&self, touches: bool) {
        self.state.lock().share_touches_note = touches;
    }

    /// Delay every operation, so callers observe an outstanding request.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    async fn round_trip(&self) {
        let latency = self.state.lock().latency;
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }
}

fn insert_note(state: &mut MemoryState, title: Option<String>, content: String) -> Note {
    state.last_id += 1;
    let watermark = state.next_watermark();
    let note = Note {
        id: NoteId::new(state.last_id),
        title,
        content,
        created_at: Some(watermark.clone()),
        updated_at: Some(watermark),
        share_id: None,
    };
    state.notes.insert(note.id, note.clone());
    note
}

fn validate_fields(title: Option<&str>, content: Option<&str>) -> Result<()> {
    if title.is_some_and(|title| title.chars().count() > MAX_TITLE_CHARS) {
        return Err(Error::Api {
            status: 422,
            message: format!("title must be at most {MAX_TITLE_CHARS} characters"),
        });
    }
    if let Some(content) = content {
        if content.is_empty() || content.chars().count() > MAX_CONTENT_CHARS {
            return Err(Error::Api {
                status: 422,
                message: format!("content must be 1..={MAX_CONTENT_CHARS} characters"),
            });
        }
    }
    Ok(())
}

impl NoteStore for MemoryNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.list += 1;
        state.ensure_reachable()?;
        Ok(state.notes.values().rev().cloned().collect())
    }

    async fn create(&self, note: &NewNote) -> Result<Note> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.create += 1;
        state.ensure_reachable()?;
        validate_fields(note.title.as_deref(), Some(&note.content))?;
        Ok(insert_note(&mut state, note.title.clone(), note.content.clone()))
    }

    async fn get(&self, id: NoteId) -> Result<Note> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.get += 1;
        state.ensure_reachable()?;
        if let Some(message) = state.fail_next_get.take() {
            return Err(Error::Api {
                status: 500,
                message,
            });
        }
        state
            .notes
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn patch(&self, id: NoteId, patch: &NotePatch) -> Result<Note> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.patch += 1;
        state.ensure_reachable()?;
        if let Some(message) = state.fail_next_patch.take() {
            return Err(Error::Api {
                status: 500,
                message,
            });
        }
        validate_fields(patch.title.as_deref(), patch.content.as_deref())?;

        let updated_at = state.next_watermark();
        let note = state.note_mut(id)?;
        if let Some(title) = &patch.title {
            note.title = Some(title.clone());
        }
        if let Some(content) = &patch.content {
            note.content.clone_from(content);
        }
        note.updated_at = Some(updated_at);
        Ok(note.clone())
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.delete += 1;
        state.ensure_reachable()?;
        state
            .notes
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn share(&self, id: NoteId) -> Result<ShareToken> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.share += 1;
        state.ensure_reachable()?;
        let updated_at = state
            .share_touches_note
            .then(|| state.next_watermark());
        let note = state.note_mut(id)?;
        let share_id = note
            .share_id
            .get_or_insert_with(|| Uuid::now_v7().to_string())
            .clone();
        if updated_at.is_some() {
            note.updated_at = updated_at;
        }
        Ok(ShareToken { share_id })
    }

    async fn get_shared(&self, share_id: &str) -> Result<Note> {
        self.round_trip().await;
        let mut state = self.state.lock();
        state.calls.get_shared += 1;
        state.ensure_reachable()?;
        state
            .notes
            .values()
            .find(|note| note.share_id.as_deref() == Some(share_id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("shared note {share_id}")))
    }
}
