use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::sentiment::{SentimentAnalyzer, Tone};

/// A free-text submission with its sentiment score.
///
/// `id` is the creation time in milliseconds and doubles as the seed for
/// bubble placement, so it must never change once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    pub text: String,
    pub score: i32,
    pub id: i64,
}

impl Thought {
    /// Score and stamp a new thought. Returns `None` for blank input.
    pub fn compose(text: &str, analyzer: &SentimentAnalyzer, clock: &ThoughtClock) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            text: text.to_string(),
            score: analyzer.analyze(text).score,
            id: clock.next_id(),
        })
    }

    pub fn tone(&self) -> Tone {
        Tone::from_score(self.score)
    }
}

/// Hands out strictly increasing millisecond timestamps for one client
#[derive(Debug, Default)]
pub struct ThoughtClock {
    last: AtomicI64,
}

impl ThoughtClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);

        now.max(previous + 1)
    }
}
