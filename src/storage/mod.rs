//! Local key-value persistence for thoughts and quiz results.
//!
//! Every write fires a [`StorageEvent`] so that other views of the same
//! store can re-render from the new value.

mod class_store;
mod file;
mod memory;

pub use class_store::ClassStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use tokio::sync::broadcast;

use crate::error::Result;

/// Key holding the ordered thought list
pub const THOUGHTS_KEY: &str = "class_thoughts";
/// Key holding the versioned quiz statistics
pub const QUIZ_RESULTS_KEY: &str = "class_quiz_results";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification that `key` was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
}

/// String key-value store with change notification
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Receive an event for every subsequent `set`
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

fn event_channel() -> broadcast::Sender<StorageEvent> {
    let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    sender
}

fn notify(sender: &broadcast::Sender<StorageEvent>, key: &str) {
    // no subscribers is fine
    let _ = sender.send(StorageEvent { key: key.to_string() });
}
