//! Local draft persistence
//!
//! Drafts live in a small key-value store so no keystroke is lost when the
//! note service is unreachable. Every failure in this layer is logged and
//! swallowed: local persistence must never interrupt editing or saving.

mod memory;
mod migrations;
mod sqlite;

use crate::error::{Error, Result};
use crate::models::{draft_key, Draft, NoteId};

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Minimal string key-value storage
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Draft records keyed by note id on top of a `KeyValueStore`
#[derive(Debug, Clone)]
pub struct DraftCache<K> {
    store: K,
}

impl<K: KeyValueStore> DraftCache<K> {
    pub const fn new(store: K) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &K {
        &self.store
    }

    /// Load the draft for `id`; unreadable or corrupt entries count as absent.
    pub fn load(&self, id: NoteId) -> Option<Draft> {
        let key = draft_key(id);
        let raw = match self.store.get(&key) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read draft {}: {}", key, error);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(error) => {
                tracing::warn!("Ignoring unreadable draft {}: {}", key, error);
                None
            }
        }
    }

    /// Persist `draft` for `id`. Returns whether the write succeeded.
    pub fn save(&self, id: NoteId, draft: &Draft) -> bool {
        let key = draft_key(id);
        let result = serde_json::to_string(draft)
            .map_err(Error::from)
            .and_then(|raw| self.store.set(&key, &raw));
        match result {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Failed to persist draft {}: {}", key, error);
                false
            }
        }
    }

    /// Remove the draft for `id`, if any.
    pub fn clear(&self, id: NoteId) {
        let key = draft_key(id);
        if let Err(error) = self.store.remove(&key) {
            tracing::warn!("Failed to remove draft {}: {}", key, error);
        }
    }
}
