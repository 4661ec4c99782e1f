//! In-memory key-value store

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::KeyValueStore;

#[derive(Default)]
struct Entries {
    values: HashMap<String, String>,
    failing: bool,
}

/// `KeyValueStore` kept in process memory; clones share entries
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every operation fail, as a full or disabled storage would.
    pub fn set_failing(&self, failing: bool) {
        self.entries.lock().failing = failing;
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock();
        if entries.failing {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        Ok(entries.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.failing {
            return Err(Error::Storage("quota exceeded".to_string()));
        }
        entries.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.failing {
            return Err(Error::Storage("storage unavailable".to_string()));
        }
        entries.values.remove(key);
        Ok(())
    }
}
