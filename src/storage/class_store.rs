use std::sync::Arc;
use tokio::sync::broadcast;

use super::{KeyValueStore, StorageEvent, QUIZ_RESULTS_KEY, THOUGHTS_KEY};
use crate::activity::Thought;
use crate::error::Result;
use crate::quiz::{migration, Attribution, QuizStats};

/// Thoughts and quiz statistics of one room, backed by a key-value store.
///
/// The statistics are cached in memory; every change is written through.
pub struct ClassStore {
    store: Arc<dyn KeyValueStore>,
    question_count: u32,
    stats: QuizStats,
}

impl ClassStore {
    pub fn open(store: Arc<dyn KeyValueStore>, question_count: u32) -> Self {
        let stats = load_stats(store.as_ref(), question_count);
        Self {
            store,
            question_count,
            stats,
        }
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Re-read the statistics after an external change
    pub fn reload(&mut self) {
        self.stats = load_stats(self.store.as_ref(), self.question_count);
    }

    pub fn snapshot(&self) -> QuizStats {
        self.stats.clone()
    }

    pub fn record_answer(&mut self, question: Option<i64>, is_correct: bool) -> Result<Attribution> {
        let attribution = self.stats.record_answer(question, is_correct);
        self.persist_stats()?;
        Ok(attribution)
    }

    /// Thoughts in insertion order. An unreadable list is treated as empty.
    pub fn thoughts(&self) -> Result<Vec<Thought>> {
        let Some(raw) = self.store.get(THOUGHTS_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(thoughts) => Ok(thoughts),
            Err(e) => {
                tracing::warn!(error = %e, "Stored thoughts are unreadable, starting from an empty list");
                Ok(Vec::new())
            }
        }
    }

    pub fn append_thought(&self, thought: Thought) -> Result<()> {
        let mut thoughts = self.thoughts()?;
        thoughts.push(thought);
        self.store.set(THOUGHTS_KEY, &serde_json::to_string(&thoughts)?)
    }

    /// Zero the statistics and clear the thought list
    pub fn reset(&mut self) -> Result<()> {
        self.stats = QuizStats::new(self.question_count);
        self.persist_stats()?;
        self.store.set(THOUGHTS_KEY, "[]")?;
        tracing::info!("Quiz results and thoughts reset");
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.store.subscribe()
    }

    /// Stored value for a key as written, without decoding
    pub fn raw(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key)
    }

    fn persist_stats(&self) -> Result<()> {
        self.store.set(QUIZ_RESULTS_KEY, &migration::encode(&self.stats)?)
    }
}

fn load_stats(store: &dyn KeyValueStore, question_count: u32) -> QuizStats {
    let raw = match store.get(QUIZ_RESULTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return QuizStats::new(question_count),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read quiz results, starting from zero");
            return QuizStats::new(question_count);
        }
    };

    let stats = match migration::migrate(&raw, question_count) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "Stored quiz results unusable, starting from zero");
            return QuizStats::new(question_count);
        }
    };

    // write back upgraded shapes so the next read skips migration
    match migration::encode(&stats) {
        Ok(encoded) if encoded != raw => {
            if let Err(e) = store.set(QUIZ_RESULTS_KEY, &encoded) {
                tracing::warn!(error = %e, "Failed to store migrated quiz results");
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to encode migrated quiz results"),
    }

    stats
}
