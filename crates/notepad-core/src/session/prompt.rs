//! Blocking user decisions raised by an editor session

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::{ConflictChoice, Draft, EditConflict, Note};

/// Host-provided answers to the session's questions.
///
/// Calls are synchronous: editing does not continue until they return.
pub trait Prompter: Send + Sync + 'static {
    /// A local draft differs from the server copy; `true` restores it.
    fn restore_draft(&self, draft: &Draft, server: &Note) -> bool;

    /// The note changed elsewhere since editing began.
    fn resolve_conflict(&self, conflict: &EditConflict) -> ConflictChoice;

    /// Confirm deleting the note.
    fn confirm_delete(&self, note: &Note) -> bool;
}

/// How many times each question was asked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptLog {
    pub restore_draft: usize,
    pub resolve_conflict: usize,
    pub confirm_delete: usize,
}

#[derive(Debug)]
struct Script {
    restore_draft: bool,
    conflict_choice: ConflictChoice,
    confirm_delete: bool,
    log: PromptLog,
}

/// `Prompter` with fixed answers, for non-interactive runs and tests.
/// Clones share answers and the prompt log.
#[derive(Debug, Clone)]
pub struct ScriptedPrompter {
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                restore_draft: true,
                conflict_choice: ConflictChoice::Cancel,
                confirm_delete: true,
                log: PromptLog::default(),
            })),
        }
    }
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_restore_draft(self, restore: bool) -> Self {
        self.script.lock().restore_draft = restore;
        self
    }

    #[must_use]
    pub fn with_conflict_choice(self, choice: ConflictChoice) -> Self {
        self.set_conflict_choice(choice);
        self
    }

    #[must_use]
    pub fn with_confirm_delete(self, confirm: bool) -> Self {
        self.script.lock().confirm_delete = confirm;
        self
    }

    pub fn set_conflict_choice(&self, choice: ConflictChoice) {
        self.script.lock().conflict_choice = choice;
    }

    pub fn log(&self) -> PromptLog {
        self.script.lock().log
    }
}

impl Prompter for ScriptedPrompter {
    fn restore_draft(&self, _draft: &Draft, _server: &Note) -> bool {
        let mut script = self.script.lock();
        script.log.restore_draft += 1;
        script.restore_draft
    }

    fn resolve_conflict(&self, _conflict: &EditConflict) -> ConflictChoice {
        let mut script = self.script.lock();
        script.log.resolve_conflict += 1;
        script.conflict_choice
    }

    fn confirm_delete(&self, _note: &Note) -> bool {
        let mut script = self.script.lock();
        script.log.confirm_delete += 1;
        script.confirm_delete
    }
}
