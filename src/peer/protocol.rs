use serde::{Deserialize, Serialize};

use crate::activity::Thought;
use crate::quiz::{QuizAnswer, QuizAnswerKey, QuizStats};

/// Messages exchanged between the host and students.
///
/// Serialised as `{"type": "...", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PeerMessage {
    /// student -> host
    Thought(Thought),

    /// student -> host
    Quiz(QuizAnswer),

    /// host -> student
    StatsUpdate(QuizStats),

    /// host -> student
    QuizConfig(QuizAnswerKey),
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::Thought(_) => "thought",
            PeerMessage::Quiz(_) => "quiz",
            PeerMessage::StatsUpdate(_) => "stats_update",
            PeerMessage::QuizConfig(_) => "quiz_config",
        }
    }
}
