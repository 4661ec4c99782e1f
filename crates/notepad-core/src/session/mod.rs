//! Editor session
//!
//! An `EditorSession` drives the editing of one note. Every buffer change is
//! mirrored into the draft cache before anything else happens, autosave is
//! debounced, remote modifications are detected before each write, and the
//! save status is tracked for the host UI.
//!
//! The session is a cheap `Clone` handle; timers hold only a weak reference,
//! so dropping the last handle cancels any pending autosave.

mod dictation;
mod keys;
mod payload;
mod prompt;
mod state;
mod timers;

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::drafts::{DraftCache, KeyValueStore};
use crate::error::{Error, Result};
use crate::models::{
    ConflictChoice, Draft, EditConflict, NewNote, Note, NoteId, NotePatch, Watermark,
};
use crate::store::NoteStore;
use crate::util::{blank_to_none, unix_millis_now};

pub use dictation::{Dictation, DictationStatus, RecognitionResult};
pub use keys::{Key, KeyAction, KeyPress, ShortcutPlatform};
pub use payload::{infer_title, INFERRED_TITLE_MAX_CHARS};
pub use prompt::{PromptLog, Prompter, ScriptedPrompter};
pub use state::SaveState;

use dictation::{append_transcript, split_results};
use payload::{build_payload, SavePayload};
use state::{EditBuffer, SavedSnapshot};
use timers::{TimerKind, Timers};

pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(600);
pub const DEFAULT_SAVED_DISPLAY: Duration = Duration::from_millis(800);

/// Timing and keyboard settings for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Inactivity before an autosave starts
    pub autosave_debounce: Duration,
    /// How long `Saved` is shown before returning to `Idle`
    pub saved_display: Duration,
    pub shortcut_platform: ShortcutPlatform,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            saved_display: DEFAULT_SAVED_DISPLAY,
            shortcut_platform: ShortcutPlatform::current(),
        }
    }
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The buffer was written to the note
    Saved,
    /// The buffer already matches the last saved values
    Unchanged,
    /// Another save is outstanding; this request was dropped
    InFlight,
    /// A remote edit was detected and the user kept the remote copy
    Cancelled,
    /// The buffer was saved as a new note, which the session now edits
    Duplicated(NoteId),
}

/// Point-in-time copy of everything the host renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
    pub save_state: SaveState,
    pub online: bool,
    pub last_error: Option<String>,
    pub share_id: Option<String>,
    pub dictation: DictationStatus,
    pub closed: bool,
}

impl SessionView {
    pub const fn status_label(&self) -> &'static str {
        self.save_state.label(self.online)
    }
}

struct SessionState {
    note: Note,
    buffer: EditBuffer,
    last_saved: SavedSnapshot,
    base_updated_at: Option<Watermark>,
    save_state: SaveState,
    in_flight: bool,
    /// Bumped on every buffer change
    revision: u64,
    last_error: Option<String>,
    share_id: Option<String>,
    online: bool,
    closed: bool,
    dictation: DictationStatus,
    timers: Timers,
}

impl SessionState {
    fn new(note: Note) -> Self {
        Self {
            buffer: EditBuffer::from_note(&note),
            last_saved: SavedSnapshot::from_note(&note),
            base_updated_at: note.updated_at.clone(),
            share_id: note.share_id.clone(),
            note,
            save_state: SaveState::Idle,
            in_flight: false,
            revision: 0,
            last_error: None,
            online: true,
            closed: false,
            dictation: DictationStatus::default(),
            timers: Timers::default(),
        }
    }

    fn draft(&self) -> Draft {
        Draft {
            ts: unix_millis_now(),
            title: blank_to_none(Some(self.buffer.title.as_str())),
            content: self.buffer.content.clone(),
            base_updated_at: self.base_updated_at.clone(),
        }
    }

    fn has_unsaved_changes(&self) -> bool {
        self.buffer.normalized() != self.last_saved
    }
}

struct Inner<S, K, P> {
    store: S,
    drafts: DraftCache<K>,
    prompter: P,
    dictation: Option<Arc<dyn Dictation>>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    /// Signalled whenever the in-flight flag clears
    save_settled: Notify,
}

/// Clears the in-flight flag and wakes waiters, however the save ends.
struct SaveGuard<'a> {
    state: &'a Mutex<SessionState>,
    settled: &'a Notify,
    armed: bool,
}

impl<'a> SaveGuard<'a> {
    const fn new(state: &'a Mutex<SessionState>, settled: &'a Notify) -> Self {
        Self {
            state,
            settled,
            armed: true,
        }
    }

    fn finish(mut self, state: &mut SessionState) {
        state.in_flight = false;
        self.armed = false;
        self.settled.notify_waiters();
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().in_flight = false;
            self.settled.notify_waiters();
        }
    }
}

struct SaveRequest {
    id: NoteId,
    payload: SavePayload,
    revision: u64,
    online: bool,
}

enum SaveStart {
    Ready(SaveRequest),
    Skip(SaveOutcome),
}

/// Collects a session's collaborators before the note is loaded
pub struct SessionBuilder<S, K, P> {
    store: S,
    drafts: DraftCache<K>,
    prompter: P,
    dictation: Option<Arc<dyn Dictation>>,
    settings: SessionSettings,
}

impl<S, K, P> SessionBuilder<S, K, P>
where
    S: NoteStore,
    K: KeyValueStore,
    P: Prompter,
{
    #[must_use]
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn dictation(mut self, dictation: Arc<dyn Dictation>) -> Self {
        self.dictation = Some(dictation);
        self
    }

    /// Load note `id` and offer any pending local draft.
    ///
    /// Fails only when the note cannot be loaded.
    pub async fn open(self, id: NoteId) -> Result<EditorSession<S, K, P>> {
        let note = self
            .store
            .get(id)
            .await
            .inspect_err(|error| tracing::warn!("Failed to load note {}: {}", id, error))?;

        let session = EditorSession {
            inner: Arc::new(Inner {
                store: self.store,
                drafts: self.drafts,
                prompter: self.prompter,
                dictation: self.dictation,
                settings: self.settings,
                state: Mutex::new(SessionState::new(note)),
                save_settled: Notify::new(),
            }),
        };
        session.offer_draft();
        tracing::debug!("Opened editor session for note {}", id);
        Ok(session)
    }
}

/// Editing session for a single note
pub struct EditorSession<S, K, P> {
    inner: Arc<Inner<S, K, P>>,
}

impl<S, K, P> Clone for EditorSession<S, K, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, K, P> EditorSession<S, K, P>
where
    S: NoteStore,
    K: KeyValueStore,
    P: Prompter,
{
    pub fn builder(store: S, drafts: DraftCache<K>, prompter: P) -> SessionBuilder<S, K, P> {
        SessionBuilder {
            store,
            drafts,
            prompter,
            dictation: None,
            settings: SessionSettings::default(),
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.inner.state.lock().note.id
    }

    pub fn save_state(&self) -> SaveState {
        self.inner.state.lock().save_state
    }

    pub fn title(&self) -> String {
        self.inner.state.lock().buffer.title.clone()
    }

    pub fn content(&self) -> String {
        self.inner.state.lock().buffer.content.clone()
    }

    pub fn share_id(&self) -> Option<String> {
        self.inner.state.lock().share_id.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub fn view(&self) -> SessionView {
        let state = self.inner.state.lock();
        SessionView {
            note_id: state.note.id,
            title: state.buffer.title.clone(),
            content: state.buffer.content.clone(),
            save_state: state.save_state,
            online: state.online,
            last_error: state.last_error.clone(),
            share_id: state.share_id.clone(),
            dictation: state.dictation.clone(),
            closed: state.closed,
        }
    }

    pub fn status_label(&self) -> &'static str {
        let state = self.inner.state.lock();
        state.save_state.label(state.online)
    }

    /// Whether leaving now could lose edits that are not yet on the server.
    pub fn should_warn_before_unload(&self) -> bool {
        self.inner.state.lock().save_state.blocks_unload()
    }

    /// Public link for the note once it has been shared.
    pub fn share_url(&self, base_url: &str) -> Option<String> {
        let share_id = self.share_id()?;
        Some(format!("{}/share/{}", base_url.trim_end_matches('/'), share_id))
    }

    // Buffer input

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|buffer| buffer.title = title);
    }

    pub fn set_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.edit(|buffer| buffer.content = content);
    }

    fn edit(&self, apply: impl FnOnce(&mut EditBuffer)) {
        let mut state = self.inner.state.lock();
        if state.closed {
            tracing::debug!("Ignoring input for closed session {}", state.note.id);
            return;
        }

        let before = state.buffer.clone();
        apply(&mut state.buffer);
        if state.buffer == before {
            return;
        }

        state.revision += 1;
        self.persist_draft(&state);
        self.reconcile_dirty(&mut state);
    }

    fn persist_draft(&self, state: &SessionState) {
        self.inner.drafts.save(state.note.id, &state.draft());
    }

    fn reconcile_dirty(&self, state: &mut SessionState) {
        // Completion of the outstanding save re-checks the buffer.
        if state.save_state == SaveState::Saving {
            return;
        }

        if state.has_unsaved_changes() {
            state.save_state = SaveState::Dirty;
            state.timers.cancel(TimerKind::ClearSaved);
            self.schedule_autosave(state);
        } else if state.save_state == SaveState::Dirty {
            state.save_state = SaveState::Idle;
            state.timers.cancel(TimerKind::Autosave);
        }
    }

    // Draft restore

    fn offer_draft(&self) {
        let (id, server) = {
            let state = self.inner.state.lock();
            (state.note.id, state.note.clone())
        };
        let Some(draft) = self.inner.drafts.load(id) else {
            return;
        };

        let local = SavedSnapshot {
            title: blank_to_none(draft.title.as_deref()),
            content: draft.content.clone(),
        };
        if local == SavedSnapshot::from_note(&server) {
            tracing::debug!("Draft for note {} matches the server copy", id);
            self.inner.drafts.clear(id);
            return;
        }

        if !self.inner.prompter.restore_draft(&draft, &server) {
            tracing::info!("Discarded local draft for note {}", id);
            self.inner.drafts.clear(id);
            return;
        }

        let mut state = self.inner.state.lock();
        state.buffer = EditBuffer {
            title: draft.title.clone().unwrap_or_default(),
            content: draft.content,
        };
        if draft.base_updated_at.is_some() {
            state.base_updated_at = draft.base_updated_at;
        }
        state.revision += 1;
        state.save_state = SaveState::Dirty;
        self.persist_draft(&state);
        self.schedule_autosave(&mut state);
        tracing::info!("Restored local draft for note {}", id);
    }

    // Saving

    /// Save the buffer now.
    ///
    /// Returns `Err` when the store rejected the write; the session is then in
    /// `SaveState::Error` and the draft is kept.
    pub async fn save_now(&self) -> Result<SaveOutcome> {
        let request = match self.begin_save()? {
            SaveStart::Ready(request) => request,
            SaveStart::Skip(outcome) => return Ok(outcome),
        };
        let guard = SaveGuard::new(&self.inner.state, &self.inner.save_settled);

        if request.online {
            if let Some(conflict) = self.check_conflict(request.id).await {
                match self.inner.prompter.resolve_conflict(&conflict) {
                    ConflictChoice::Overwrite => {
                        tracing::info!("Overwriting remote changes to note {}", request.id);
                    }
                    ConflictChoice::Duplicate => return self.duplicate(guard, &request).await,
                    ConflictChoice::Cancel => {
                        tracing::info!("Save of note {} cancelled after conflict", request.id);
                        return Ok(SaveOutcome::Cancelled);
                    }
                }
            }
        }

        self.mark_saving();
        let patch = NotePatch {
            title: request.payload.title.clone(),
            content: Some(request.payload.content.clone()),
        };
        let result = self.inner.store.patch(request.id, &patch).await;

        let mut state = self.inner.state.lock();
        guard.finish(&mut state);
        match result {
            Ok(updated) => {
                self.apply_saved(&mut state, updated, &request);
                Ok(SaveOutcome::Saved)
            }
            Err(error) => {
                Self::apply_failure(&mut state, &error);
                Err(error)
            }
        }
    }

    /// Wait until no save is outstanding.
    async fn wait_for_save(&self) {
        loop {
            let mut settled = std::pin::pin!(self.inner.save_settled.notified());
            // Register before checking, so a wake between the two is not lost.
            settled.as_mut().enable();
            if !self.inner.state.lock().in_flight {
                return;
            }
            settled.await;
        }
    }

    /// Save until the server holds the current buffer.
    ///
    /// An outstanding save is awaited first; if it fails, or a conflict is
    /// cancelled, the buffer is not on the server and this returns `Err`.
    async fn save_settled(&self) -> Result<()> {
        loop {
            match self.save_now().await? {
                SaveOutcome::InFlight => {
                    self.wait_for_save().await;
                    let state = self.inner.state.lock();
                    if state.save_state == SaveState::Error {
                        let message = state
                            .last_error
                            .clone()
                            .unwrap_or_else(|| "save failed".to_string());
                        return Err(Error::NotSaved(message));
                    }
                }
                SaveOutcome::Cancelled => {
                    return Err(Error::NotSaved(
                        "save was cancelled after a conflicting edit".to_string(),
                    ));
                }
                SaveOutcome::Saved | SaveOutcome::Unchanged | SaveOutcome::Duplicated(_) => {
                    return Ok(());
                }
            }
        }
    }

    fn begin_save(&self) -> Result<SaveStart> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(Error::SessionClosed);
        }
        if state.in_flight {
            tracing::debug!("Save of note {} already in flight", state.note.id);
            return Ok(SaveStart::Skip(SaveOutcome::InFlight));
        }

        let payload = build_payload(&state.buffer, &state.last_saved);
        if payload.matches(&state.last_saved) {
            return Ok(SaveStart::Skip(SaveOutcome::Unchanged));
        }

        state.in_flight = true;
        state.timers.cancel(TimerKind::Autosave);
        Ok(SaveStart::Ready(SaveRequest {
            id: state.note.id,
            payload,
            revision: state.revision,
            online: state.online,
        }))
    }

    /// Compare the session watermark with the server copy.
    ///
    /// A failed lookup is not a conflict: the save goes ahead optimistically.
    async fn check_conflict(&self, id: NoteId) -> Option<EditConflict> {
        let latest = match self.inner.store.get(id).await {
            Ok(note) => note,
            Err(error) => {
                tracing::warn!("Conflict check for note {} failed: {}", id, error);
                return None;
            }
        };

        let state = self.inner.state.lock();
        match (&state.base_updated_at, latest.updated_at) {
            (Some(base), Some(remote)) if *base != remote => Some(EditConflict {
                note_id: id,
                base_updated_at: base.clone(),
                remote_updated_at: remote,
            }),
            _ => None,
        }
    }

    fn mark_saving(&self) {
        let mut state = self.inner.state.lock();
        state.save_state = SaveState::Saving;
        state.last_error = None;
        state.timers.cancel(TimerKind::ClearSaved);
    }

    fn apply_saved(&self, state: &mut SessionState, updated: Note, request: &SaveRequest) {
        let id = updated.id;
        state.last_saved = SavedSnapshot::from_note(&updated);
        if updated.updated_at.is_some() {
            state.base_updated_at.clone_from(&updated.updated_at);
        }
        if updated.share_id.is_some() {
            state.share_id.clone_from(&updated.share_id);
        }
        if request.payload.title_inferred && state.buffer.title.trim().is_empty() {
            if let Some(title) = &state.last_saved.title {
                state.buffer.title.clone_from(title);
            }
        }
        state.note = updated;
        state.last_error = None;
        tracing::info!("Saved note {}", id);

        if state.revision != request.revision && state.has_unsaved_changes() {
            // Input arrived while the write was outstanding.
            state.save_state = SaveState::Dirty;
            self.persist_draft(state);
            self.schedule_autosave(state);
            return;
        }

        self.inner.drafts.clear(id);
        state.save_state = SaveState::Saved;
        self.schedule_clear_saved(state);
    }

    fn apply_failure(state: &mut SessionState, error: &Error) {
        tracing::warn!("Failed to save note {}: {}", state.note.id, error);
        state.save_state = SaveState::Error;
        state.last_error = Some(error.to_string());
    }

    async fn duplicate(&self, guard: SaveGuard<'_>, request: &SaveRequest) -> Result<SaveOutcome> {
        self.mark_saving();
        let new_note = NewNote {
            title: request.payload.title.clone(),
            content: request.payload.content.clone(),
        };
        let result = self.inner.store.create(&new_note).await;

        let mut state = self.inner.state.lock();
        guard.finish(&mut state);
        let created = match result {
            Ok(created) => created,
            Err(error) => {
                Self::apply_failure(&mut state, &error);
                return Err(error);
            }
        };

        let previous = state.note.id;
        let id = created.id;
        self.inner.drafts.clear(previous);
        state.timers.cancel_all();

        let edited_since = state.revision != request.revision;
        if !edited_since {
            state.buffer = EditBuffer::from_note(&created);
        }
        state.last_saved = SavedSnapshot::from_note(&created);
        state.base_updated_at.clone_from(&created.updated_at);
        state.share_id = None;
        state.last_error = None;
        state.note = created;
        tracing::info!("Saved note {} as new note {}", previous, id);

        if edited_since && state.has_unsaved_changes() {
            state.save_state = SaveState::Dirty;
            self.persist_draft(&state);
            self.schedule_autosave(&mut state);
        } else {
            state.save_state = SaveState::Idle;
        }
        Ok(SaveOutcome::Duplicated(id))
    }

    // Timers

    fn schedule_autosave(&self, state: &mut SessionState) {
        let session = Arc::downgrade(&self.inner);
        state.timers.schedule(
            TimerKind::Autosave,
            self.inner.settings.autosave_debounce,
            move |generation| async move {
                if let Some(session) = Self::upgrade(&session) {
                    session.autosave_elapsed(generation).await;
                }
            },
        );
    }

    fn schedule_clear_saved(&self, state: &mut SessionState) {
        let session = Arc::downgrade(&self.inner);
        state.timers.schedule(
            TimerKind::ClearSaved,
            self.inner.settings.saved_display,
            move |generation| async move {
                if let Some(session) = Self::upgrade(&session) {
                    session.clear_saved_elapsed(generation);
                }
            },
        );
    }

    fn upgrade(inner: &Weak<Inner<S, K, P>>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    async fn autosave_elapsed(&self, generation: u64) {
        let id = {
            let mut state = self.inner.state.lock();
            if !state.timers.release(TimerKind::Autosave, generation) {
                return;
            }
            if state.closed || state.save_state != SaveState::Dirty {
                return;
            }
            state.note.id
        };

        tracing::debug!("Autosaving note {}", id);
        if let Err(error) = self.save_now().await {
            tracing::debug!("Autosave of note {} failed: {}", id, error);
        }
    }

    fn clear_saved_elapsed(&self, generation: u64) {
        let mut state = self.inner.state.lock();
        if state.timers.release(TimerKind::ClearSaved, generation)
            && state.save_state == SaveState::Saved
        {
            state.save_state = SaveState::Idle;
        }
    }

    // Host signals

    /// Record connectivity; coming back online retries a pending save.
    pub async fn on_connectivity_change(&self, online: bool) -> Result<Option<SaveOutcome>> {
        let retry = {
            let mut state = self.inner.state.lock();
            state.online = online;
            online
                && !state.closed
                && matches!(state.save_state, SaveState::Dirty | SaveState::Error)
        };
        if !retry {
            return Ok(None);
        }

        tracing::info!("Back online, retrying save of note {}", self.note_id());
        self.save_now().await.map(Some)
    }

    pub async fn on_key(&self, press: &KeyPress) -> Result<KeyAction> {
        if self.inner.settings.shortcut_platform.is_save_shortcut(press) {
            return self.save_now().await.map(KeyAction::Save);
        }

        if press.key == Key::Escape {
            if self.inner.state.lock().dictation.listening {
                self.stop_dictation();
                return Ok(KeyAction::DictationStopped);
            }
            return Ok(KeyAction::NavigateBack);
        }

        Ok(KeyAction::Ignored)
    }

    // Share and delete

    /// Save, then publish the note. Returns the share id.
    ///
    /// Nothing is published unless the current buffer reached the server.
    pub async fn share(&self) -> Result<String> {
        self.save_settled().await?;

        let id = self.note_id();
        let token = self.inner.store.share(id).await?;
        self.inner.state.lock().share_id = Some(token.share_id.clone());
        tracing::info!("Shared note {} as {}", id, token.share_id);
        self.refresh_after_share(id).await;
        Ok(token.share_id)
    }

    /// Sharing may touch the note server-side; adopt its new watermark so the
    /// next save does not see our own share as a remote edit.
    async fn refresh_after_share(&self, id: NoteId) {
        let latest = match self.inner.store.get(id).await {
            Ok(note) => note,
            Err(error) => {
                tracing::warn!("Failed to refresh note {} after sharing: {}", id, error);
                return;
            }
        };

        let mut state = self.inner.state.lock();
        // A save started meanwhile brings back its own watermark.
        if state.closed || state.in_flight || state.note.id != id {
            return;
        }
        state.last_saved = SavedSnapshot::from_note(&latest);
        state.base_updated_at.clone_from(&latest.updated_at);
        if latest.share_id.is_some() {
            state.share_id.clone_from(&latest.share_id);
        }
        state.note = latest;
        self.reconcile_dirty(&mut state);
    }

    /// Delete the note after confirmation. Returns whether it was deleted.
    pub async fn delete(&self) -> Result<bool> {
        let note = {
            let state = self.inner.state.lock();
            if state.closed {
                return Err(Error::SessionClosed);
            }
            state.note.clone()
        };
        if !self.inner.prompter.confirm_delete(&note) {
            return Ok(false);
        }

        self.inner.store.delete(note.id).await?;
        self.inner.drafts.clear(note.id);
        self.close();
        tracing::info!("Deleted note {}", note.id);
        Ok(true)
    }

    /// Stop timers and ignore further input.
    pub fn close(&self) {
        let listening = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.timers.cancel_all();
            state.dictation.listening
        };
        if listening {
            self.stop_dictation();
        }
    }

    // Dictation

    pub fn dictation_supported(&self) -> bool {
        self.inner.dictation.is_some()
    }

    /// Ask the capability to start listening.
    ///
    /// A start failure is shown as the dictation notice rather than returned.
    pub fn start_dictation(&self) -> Result<()> {
        let Some(dictation) = &self.inner.dictation else {
            return Err(Error::DictationUnsupported);
        };

        self.inner.state.lock().dictation.error = None;
        if let Err(error) = dictation.start() {
            tracing::warn!("Failed to start dictation: {}", error);
            self.inner.state.lock().dictation.error = Some(error.to_string());
        }
        Ok(())
    }

    pub fn stop_dictation(&self) {
        if let Some(dictation) = &self.inner.dictation {
            dictation.stop();
        }
    }

    pub fn on_dictation_started(&self) {
        let mut state = self.inner.state.lock();
        state.dictation.listening = true;
        state.dictation.error = None;
    }

    pub fn on_dictation_ended(&self) {
        let mut state = self.inner.state.lock();
        state.dictation.listening = false;
        state.dictation.interim.clear();
    }

    pub fn on_dictation_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Dictation error: {}", message);
        self.inner.state.lock().dictation.error = Some(message);
    }

    /// Append final text to the content and replace the interim preview.
    pub fn on_dictation_results(&self, results: &[RecognitionResult]) {
        let (finals, interim) = split_results(results);
        if !finals.trim().is_empty() {
            self.edit(|buffer| append_transcript(&mut buffer.content, &finals));
        }
        self.inner.state.lock().dictation.interim = interim;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::MemoryKeyValueStore;
    use crate::store::MemoryNoteStore;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    type TestSession = EditorSession<MemoryNoteStore, MemoryKeyValueStore, ScriptedPrompter>;

    struct Harness {
        store: MemoryNoteStore,
        kv: MemoryKeyValueStore,
        prompter: ScriptedPrompter,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MemoryNoteStore::new(),
                kv: MemoryKeyValueStore::new(),
                prompter: ScriptedPrompter::new(),
            }
        }

        fn builder(&self) -> SessionBuilder<MemoryNoteStore, MemoryKeyValueStore, ScriptedPrompter> {
            EditorSession::builder(
                self.store.clone(),
                DraftCache::new(self.kv.clone()),
                self.prompter.clone(),
            )
            .settings(SessionSettings {
                shortcut_platform: ShortcutPlatform::Other,
                ..SessionSettings::default()
            })
        }

        async fn open(&self, id: NoteId) -> TestSession {
            self.builder().open(id).await.unwrap()
        }

        fn draft(&self, id: NoteId) -> Option<Draft> {
            DraftCache::new(self.kv.clone()).load(id)
        }
    }

    #[derive(Default)]
    struct FakeDictation {
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_start: bool,
    }

    impl Dictation for FakeDictation {
        fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(Error::InvalidInput("microphone permission denied".to_string()));
            }
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn input_persists_draft_before_any_save() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        session.set_content("body!");

        let draft = harness.draft(note.id).unwrap();
        assert_eq!(draft.content, "body!");
        assert_eq!(draft.title.as_deref(), Some("Title"));
        assert_eq!(draft.base_updated_at, note.updated_at);
        assert_eq!(session.save_state(), SaveState::Dirty);
        assert_eq!(harness.store.calls().patch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_waits_for_inactivity() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "b");
        let session = harness.open(note.id).await;

        for text in ["bo", "bod", "body"] {
            session.set_content(text);
            sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(harness.store.calls().patch, 0);

        sleep(Duration::from_millis(400)).await;
        assert_eq!(harness.store.calls().patch, 1);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "body");
        assert_eq!(session.save_state(), SaveState::Saved);
        assert_eq!(harness.draft(note.id), None);

        sleep(Duration::from_millis(800)).await;
        assert_eq!(session.save_state(), SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn retyping_saved_values_returns_to_idle() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        session.set_content("body and more");
        assert!(session.should_warn_before_unload());
        session.set_content("body");

        assert_eq!(session.save_state(), SaveState::Idle);
        assert!(!session.should_warn_before_unload());
        sleep(Duration::from_secs(2)).await;
        assert_eq!(harness.store.calls().patch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_buffer_is_not_sent() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Unchanged);
        assert_eq!(harness.store.calls().patch, 0);
        assert_eq!(harness.store.calls().get, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_save_requests_are_dropped() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        harness.store.set_latency(Some(Duration::from_millis(100)));
        session.set_content("changed");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.save_now().await }
        });
        sleep(Duration::from_millis(10)).await;

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::InFlight);
        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.store.calls().patch, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn edits_during_save_keep_session_dirty() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "one");
        let session = harness.open(note.id).await;
        harness.store.set_latency(Some(Duration::from_millis(100)));
        session.set_content("one two");

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.save_now().await }
        });
        sleep(Duration::from_millis(150)).await;
        assert_eq!(session.save_state(), SaveState::Saving);
        session.set_content("one two three");

        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert_eq!(session.save_state(), SaveState::Dirty);
        assert_eq!(harness.draft(note.id).unwrap().content, "one two three");

        sleep(Duration::from_secs(1)).await;
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "one two three");
        assert_eq!(harness.store.calls().patch, 2);
        assert_eq!(harness.draft(note.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_cancel_leaves_server_untouched() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "original");
        let session = harness.open(note.id).await;
        harness.store.edit_remotely(note.id, "remote").unwrap();

        session.set_content("local");
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Cancelled);

        assert_eq!(harness.prompter.log().resolve_conflict, 1);
        assert_eq!(harness.store.calls().patch, 0);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "remote");
        assert_eq!(session.save_state(), SaveState::Dirty);
        assert_eq!(harness.draft(note.id).unwrap().content, "local");
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_overwrite_replaces_remote_and_advances_watermark() {
        let harness = Harness::new();
        harness.prompter.set_conflict_choice(ConflictChoice::Overwrite);
        let note = harness.store.seed(Some("Title"), "original");
        let session = harness.open(note.id).await;
        harness.store.edit_remotely(note.id, "remote").unwrap();

        session.set_content("local");
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "local");

        session.set_content("local again");
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.prompter.log().resolve_conflict, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_duplicate_creates_note_and_retargets_session() {
        let harness = Harness::new();
        harness.prompter.set_conflict_choice(ConflictChoice::Duplicate);
        let note = harness.store.seed(Some("Title"), "original");
        let session = harness.open(note.id).await;
        harness.store.edit_remotely(note.id, "remote").unwrap();

        session.set_content("local");
        let SaveOutcome::Duplicated(copy_id) = session.save_now().await.unwrap() else {
            panic!("expected a duplicate");
        };

        assert_ne!(copy_id, note.id);
        assert_eq!(session.note_id(), copy_id);
        assert_eq!(session.save_state(), SaveState::Idle);
        assert_eq!(harness.store.len(), 2);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "remote");
        let copy = harness.store.snapshot(copy_id).unwrap();
        assert_eq!(copy.content, "local");
        assert_eq!(copy.title.as_deref(), Some("Title"));
        assert_eq!(harness.draft(note.id), None);
        assert_eq!(harness.store.calls().patch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_keeps_draft_and_reports_error() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        harness.store.fail_next_patch("database is locked");

        session.set_content("important");
        let error = session.save_now().await.unwrap_err();

        assert!(error.to_string().contains("database is locked"));
        let view = session.view();
        assert_eq!(view.save_state, SaveState::Error);
        assert_eq!(view.status_label(), "Save failed (draft saved)");
        assert!(view.last_error.unwrap().contains("database is locked"));
        assert_eq!(harness.draft(note.id).unwrap().content, "important");
        assert!(!session.should_warn_before_unload());

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.draft(note.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_retries_failed_save() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        harness.store.set_unreachable(true);

        session.set_content("written offline");
        session.on_connectivity_change(false).await.unwrap();
        assert_eq!(session.status_label(), "Offline (draft saved)");
        assert!(session.save_now().await.is_err());
        assert_eq!(harness.store.calls().get, 1);

        harness.store.set_unreachable(false);
        let outcome = session.on_connectivity_change(true).await.unwrap();

        assert_eq!(outcome, Some(SaveOutcome::Saved));
        assert_eq!(
            harness.store.snapshot(note.id).unwrap().content,
            "written offline"
        );
        assert_eq!(session.on_connectivity_change(true).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_draft_is_saved_by_autosave() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        session.set_content("unsent work");
        drop(session);

        let session = harness.open(note.id).await;
        assert_eq!(harness.prompter.log().restore_draft, 1);
        assert_eq!(session.content(), "unsent work");
        assert_eq!(session.save_state(), SaveState::Dirty);

        sleep(Duration::from_millis(700)).await;
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "unsent work");
    }

    #[tokio::test(start_paused = true)]
    async fn declined_draft_is_discarded() {
        let harness = Harness::new();
        let prompter = harness.prompter.clone().with_restore_draft(false);
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        session.set_content("abandoned");
        drop(session);

        let session = EditorSession::builder(
            harness.store.clone(),
            DraftCache::new(harness.kv.clone()),
            prompter,
        )
        .open(note.id)
        .await
        .unwrap();

        assert_eq!(session.content(), "body");
        assert_eq!(session.save_state(), SaveState::Idle);
        assert_eq!(harness.draft(note.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_matching_server_is_cleared_without_prompt() {
        let harness = Harness::new();
        let note = harness.store.seed(None, "same");
        DraftCache::new(harness.kv.clone()).save(
            note.id,
            &Draft {
                ts: 1,
                title: Some("  ".to_string()),
                content: "same".to_string(),
                base_updated_at: note.updated_at.clone(),
            },
        );

        let session = harness.open(note.id).await;

        assert_eq!(harness.prompter.log().restore_draft, 0);
        assert_eq!(harness.draft(note.id), None);
        assert_eq!(session.save_state(), SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn restored_draft_watermark_detects_newer_server_write() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        DraftCache::new(harness.kv.clone()).save(
            note.id,
            &Draft {
                ts: 1,
                title: Some("Title".to_string()),
                content: "stale draft".to_string(),
                base_updated_at: Some(Watermark::new("1999-01-01T00:00:00.000000Z")),
            },
        );

        let session = harness.open(note.id).await;
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Cancelled);
        assert_eq!(harness.prompter.log().resolve_conflict, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn derived_title_fills_empty_title_field() {
        let harness = Harness::new();
        let note = harness.store.seed(None, "x");
        let session = harness.open(note.id).await;

        session.set_content("\n  Groceries  \nmilk");
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);

        assert_eq!(
            harness.store.snapshot(note.id).unwrap().title.as_deref(),
            Some("Groceries")
        );
        assert_eq!(session.title(), "Groceries");
        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn open_fails_for_missing_note() {
        let harness = Harness::new();
        let result = harness.builder().open(NoteId::new(404)).await;
        assert!(result.err().is_some_and(|error| error.is_not_found()));
    }

    #[tokio::test(start_paused = true)]
    async fn keyboard_shortcuts() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let dictation = Arc::new(FakeDictation::default());
        let session = harness
            .builder()
            .dictation(dictation.clone())
            .open(note.id)
            .await
            .unwrap();

        session.set_content("quick save");
        let action = session
            .on_key(&KeyPress::character("s").with_ctrl())
            .await
            .unwrap();
        assert_eq!(action, KeyAction::Save(SaveOutcome::Saved));

        session.on_dictation_started();
        let action = session.on_key(&KeyPress::new(Key::Escape)).await.unwrap();
        assert_eq!(action, KeyAction::DictationStopped);
        assert_eq!(dictation.stops.load(Ordering::SeqCst), 1);

        session.on_dictation_ended();
        let action = session.on_key(&KeyPress::new(Key::Escape)).await.unwrap();
        assert_eq!(action, KeyAction::NavigateBack);
        let action = session.on_key(&KeyPress::character("s")).await.unwrap();
        assert_eq!(action, KeyAction::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn dictation_appends_final_text_and_tracks_interim() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let dictation = Arc::new(FakeDictation::default());
        let session = harness
            .builder()
            .dictation(dictation.clone())
            .open(note.id)
            .await
            .unwrap();

        session.start_dictation().unwrap();
        session.on_dictation_started();
        session.on_dictation_results(&[
            RecognitionResult::final_text("hello"),
            RecognitionResult::interim("wor"),
        ]);

        let view = session.view();
        assert_eq!(view.content, "body hello");
        assert_eq!(view.dictation.interim, "wor");
        assert!(view.dictation.listening);
        assert_eq!(view.save_state, SaveState::Dirty);
        assert_eq!(harness.draft(note.id).unwrap().content, "body hello");

        session.on_dictation_error("no-speech");
        session.on_dictation_ended();
        let view = session.view();
        assert!(!view.dictation.listening);
        assert_eq!(view.dictation.interim, "");
        assert_eq!(view.dictation.error.as_deref(), Some("no-speech"));
        assert_eq!(dictation.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dictation_start_failure_becomes_notice() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let dictation = Arc::new(FakeDictation {
            fail_start: true,
            ..FakeDictation::default()
        });
        let session = harness
            .builder()
            .dictation(dictation)
            .open(note.id)
            .await
            .unwrap();

        session.start_dictation().unwrap();
        let notice = session.view().dictation.error.unwrap();
        assert!(notice.contains("microphone permission denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn dictation_without_capability_is_unsupported() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        assert!(!session.dictation_supported());
        assert!(matches!(
            session.start_dictation(),
            Err(Error::DictationUnsupported)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn share_saves_first() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        session.set_content("published text");
        let share_id = session.share().await.unwrap();

        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "published text");
        assert_eq!(session.share_id().as_deref(), Some(share_id.as_str()));
        assert_eq!(
            session.share_url("https://notes.example/"),
            Some(format!("https://notes.example/share/{share_id}"))
        );
        assert_eq!(session.share().await.unwrap(), share_id);
    }

    #[tokio::test(start_paused = true)]
    async fn share_is_not_requested_when_save_fails() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        harness.store.fail_next_patch("boom");

        session.set_content("edited");
        assert!(session.share().await.is_err());
        assert_eq!(harness.store.calls().share, 0);
        assert_eq!(session.share_url("https://notes.example"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn share_waits_for_outstanding_save_and_refuses_when_it_fails() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "old");
        let session = harness.open(note.id).await;
        harness.store.set_latency(Some(Duration::from_millis(100)));
        harness.store.fail_next_patch("boom");

        session.set_content("new");
        let first = tokio::spawn({
            let session = session.clone();
            async move { session.save_now().await }
        });
        sleep(Duration::from_millis(150)).await;

        let shared = session.share().await;

        assert!(matches!(shared, Err(Error::NotSaved(ref message)) if message.contains("boom")));
        assert!(first.await.unwrap().is_err());
        assert_eq!(harness.store.calls().share, 0);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "old");
        assert_eq!(session.share_id(), None);
        assert_eq!(session.save_state(), SaveState::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn share_waits_for_outstanding_save_then_publishes() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "old");
        let session = harness.open(note.id).await;
        harness.store.set_latency(Some(Duration::from_millis(100)));

        session.set_content("new");
        let first = tokio::spawn({
            let session = session.clone();
            async move { session.save_now().await }
        });
        sleep(Duration::from_millis(150)).await;

        let share_id = session.share().await.unwrap();

        assert_eq!(first.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.store.calls().patch, 1);
        assert_eq!(harness.store.calls().share, 1);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "new");
        assert_eq!(session.share_id(), Some(share_id));
    }

    #[tokio::test(start_paused = true)]
    async fn share_is_not_requested_after_cancelled_conflict() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "original");
        let session = harness.open(note.id).await;
        harness.store.edit_remotely(note.id, "remote").unwrap();

        session.set_content("local");
        let shared = session.share().await;

        assert!(matches!(shared, Err(Error::NotSaved(_))));
        assert_eq!(harness.prompter.log().resolve_conflict, 1);
        assert_eq!(harness.store.calls().share, 0);
        assert_eq!(session.save_state(), SaveState::Dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn save_after_share_does_not_conflict_with_share_write() {
        let harness = Harness::new();
        harness.store.set_share_touches_note(true);
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        session.set_content("shared text");
        session.share().await.unwrap();
        session.set_content("after sharing");

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.prompter.log().resolve_conflict, 0);
        assert_eq!(
            harness.store.snapshot(note.id).unwrap().content,
            "after sharing"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_conflict_lookup_saves_optimistically() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;

        session.set_content("local");
        harness.store.fail_next_get("lookup failed");

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(harness.store.calls().get, 2);
        assert_eq!(harness.store.calls().patch, 1);
        assert_eq!(harness.prompter.log().resolve_conflict, 0);
        assert_eq!(harness.store.snapshot(note.id).unwrap().content, "local");
        assert_eq!(harness.draft(note.id), None);
        assert_eq!(session.save_state(), SaveState::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_storage_failure_does_not_block_editing() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        harness.kv.set_failing(true);

        session.set_content("unpersisted");
        assert_eq!(session.save_state(), SaveState::Dirty);

        assert_eq!(session.save_now().await.unwrap(), SaveOutcome::Saved);
        assert_eq!(session.save_state(), SaveState::Saved);
        assert_eq!(
            harness.store.snapshot(note.id).unwrap().content,
            "unpersisted"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_closes_session_and_clears_draft() {
        let harness = Harness::new();
        let note = harness.store.seed(Some("Title"), "body");
        let session = harness.open(note.id).await;
        session.set_content("doomed");

        assert!(session.delete().await.unwrap());

        assert!(harness.store.is_empty());
        assert_eq!(harness.draft(note.id), None);
        assert!(session.is_closed());
        session.set_content("ignored");
        assert_eq!(session.content(), "doomed");
        assert!(matches!(session.save_now().await, Err(Error::SessionClosed)));
        sleep(Duration::from_secs(1)).await;
        assert_eq!(harness.store.calls().patch, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_delete_keeps_note() {
        let harness = Harness::new();
        let prompter = harness.prompter.clone().with_confirm_delete(false);
        let note = harness.store.seed(Some("Title"), "body");
        let session = EditorSession::builder(
            harness.store.clone(),
            DraftCache::new(harness.kv.clone()),
            prompter,
        )
        .open(note.id)
        .await
        .unwrap();

        assert!(!session.delete().await.unwrap());
        assert_eq!(harness.store.len(), 1);
        assert!(!session.is_closed());
    }
}
