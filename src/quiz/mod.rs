//! Multiple-choice quiz: answers, answer key and aggregate statistics.

mod answer;
mod answer_key;
pub mod migration;
mod stats;

pub use answer::QuizAnswer;
pub use answer_key::QuizAnswerKey;
pub use stats::{Attribution, QuizStats, Tally, DEFAULT_QUESTION_COUNT};
