use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DeckError, Result};

/// Correct option letter for each question number.
///
/// Serialised as a JSON object keyed by the question number as a string,
/// e.g. `{"1": "B", "2": "A"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuizAnswerKey(BTreeMap<u32, String>);

impl QuizAnswerKey {
    /// Parse the `1=B,2=A,...` form used in configuration
    pub fn parse(raw: &str) -> Result<Self> {
        let mut answers = BTreeMap::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (question, option) = entry.split_once('=').ok_or_else(|| {
                DeckError::ConfigurationParseFailed(format!("answer key entry '{}' has no '='", entry))
            })?;

            let question: u32 = question.trim().parse().map_err(|_| {
                DeckError::ConfigurationParseFailed(format!("'{}' is not a question number", question))
            })?;
            let option = option.trim();
            if option.is_empty() {
                return Err(DeckError::ConfigurationParseFailed(format!(
                    "question {} has an empty answer",
                    question
                )));
            }

            answers.insert(question, option.to_string());
        }

        Ok(Self(answers))
    }

    pub fn answer(&self, question: u32) -> Option<&str> {
        self.0.get(&question).map(String::as_str)
    }

    /// `Some(answer == key[question])`, or `None` if the key has no entry
    pub fn grade(&self, question: u32, answer: &str) -> Option<bool> {
        self.answer(question).map(|correct| correct == answer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every question must be in `1..=question_count`
    pub fn validate(&self, question_count: u32) -> Result<()> {
        match self.0.keys().find(|q| **q == 0 || **q > question_count) {
            Some(question) => Err(DeckError::InvalidConfiguration(format!(
                "answer key names question {} but the quiz has {} questions",
                question, question_count
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_grade() {
        let key = QuizAnswerKey::parse("1=B, 2=A ,3=D").unwrap();
        assert_eq!(key.len(), 3);
        assert_eq!(key.grade(1, "B"), Some(true));
        assert_eq!(key.grade(2, "B"), Some(false));
        assert_eq!(key.grade(9, "A"), None);
    }

    #[test]
    fn test_grading_is_exact() {
        let key = QuizAnswerKey::parse("1=B").unwrap();
        assert_eq!(key.grade(1, "b"), Some(false));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            QuizAnswerKey::parse("1B"),
            Err(DeckError::ConfigurationParseFailed(_))
        ));
        assert!(matches!(
            QuizAnswerKey::parse("one=B"),
            Err(DeckError::ConfigurationParseFailed(_))
        ));
        assert!(matches!(
            QuizAnswerKey::parse("1="),
            Err(DeckError::ConfigurationParseFailed(_))
        ));
        assert!(QuizAnswerKey::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_validate_range() {
        let key = QuizAnswerKey::parse("1=A,11=C").unwrap();
        assert!(key.validate(11).is_ok());
        assert!(matches!(key.validate(10), Err(DeckError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_wire_shape() {
        let key = QuizAnswerKey::parse("1=B,2=A").unwrap();
        let value = serde_json::to_value(&key).unwrap();
        assert_eq!(value, serde_json::json!({ "1": "B", "2": "A" }));

        let back: QuizAnswerKey = serde_json::from_value(value).unwrap();
        assert_eq!(back, key);
    }
}
