use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A student's self-graded answer as sent to the host.
///
/// Serialised as `{"question": 1, "isCorrect": true}`. Older clients send a
/// bare boolean and no question number; both forms are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnswerRepr")]
pub struct QuizAnswer {
    pub question: Option<i64>,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
}

impl QuizAnswer {
    pub fn new(question: u32, is_correct: bool) -> Self {
        Self {
            question: Some(question as i64),
            is_correct,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerRepr {
    Answer {
        #[serde(default)]
        question: Option<Value>,
        #[serde(rename = "isCorrect")]
        is_correct: bool,
    },
    Legacy(bool),
}

impl From<AnswerRepr> for QuizAnswer {
    fn from(repr: AnswerRepr) -> Self {
        match repr {
            AnswerRepr::Answer { question, is_correct } => Self {
                question: question.as_ref().and_then(question_number),
                is_correct,
            },
            AnswerRepr::Legacy(is_correct) => Self {
                question: None,
                is_correct,
            },
        }
    }
}

/// Integers and integer-valued strings; anything else is unknown
fn question_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
