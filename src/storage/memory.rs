use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

use super::{event_channel, notify, KeyValueStore, StorageEvent};
use crate::error::{DeckError, Result};

/// In-process store, lost when the process exits
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            events: event_channel(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| DeckError::storage("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| DeckError::storage("memory store lock poisoned"))?;
            entries.insert(key.to_string(), value.to_string());
        }
        notify(&self.events, key);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
