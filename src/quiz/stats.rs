use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// Default number of quiz questions
pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Correct/incorrect counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(default)]
    pub correct: u64,
    #[serde(default)]
    pub incorrect: u64,
}

impl Tally {
    pub fn record(&mut self, is_correct: bool) {
        if is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    pub fn answered(&self) -> u64 {
        self.correct + self.incorrect
    }

    /// Rounded percentage of correct answers, `None` when nothing was answered
    pub fn percent_correct(&self) -> Option<u32> {
        let answered = self.answered();
        if answered == 0 {
            return None;
        }
        Some(((self.correct as f64 / answered as f64) * 100.0).round() as u32)
    }
}

/// Where a recorded answer ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    Question(u32),
    /// Counted only in the total
    TotalOnly,
}

/// Aggregate quiz results for one room.
///
/// On the wire this is `{"total": {...}, "q1": {...}, ..., "qN": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStats {
    pub total: Tally,
    questions: BTreeMap<u32, Tally>,
}

impl QuizStats {
    /// Zero-valued stats with buckets `q1..=q{question_count}`
    pub fn new(question_count: u32) -> Self {
        let mut stats = Self {
            total: Tally::default(),
            questions: BTreeMap::new(),
        };
        stats.resize_questions(question_count);
        stats
    }

    /// Keep exactly the buckets `1..=question_count`. Missing ones start at
    /// zero; answers in dropped buckets stay in the total as unattributed.
    pub fn resize_questions(&mut self, question_count: u32) {
        let dropped = match question_count.checked_add(1) {
            Some(first_stale) => self.questions.split_off(&first_stale),
            None => BTreeMap::new(),
        };
        if !dropped.is_empty() {
            tracing::warn!(
                question_count,
                dropped = dropped.len(),
                "Dropping quiz buckets above the configured question count"
            );
        }
        for question in 1..=question_count {
            self.questions.entry(question).or_default();
        }
    }

    pub fn question(&self, question: u32) -> Option<&Tally> {
        self.questions.get(&question)
    }

    pub fn questions(&self) -> impl Iterator<Item = (u32, &Tally)> {
        self.questions.iter().map(|(k, v)| (*k, v))
    }

    pub fn question_count(&self) -> u32 {
        self.questions.keys().next_back().copied().unwrap_or(0)
    }

    /// Count an answer in the total and, when the question number is in
    /// `1..=question_count`, in that question too.
    pub fn record_answer(&mut self, question: Option<i64>, is_correct: bool) -> Attribution {
        self.total.record(is_correct);

        let valid = 1..=self.question_count();
        let bucket = question
            .and_then(|q| u32::try_from(q).ok())
            .filter(|q| valid.contains(q))
            .and_then(|q| self.questions.get_mut(&q).map(|tally| (q, tally)));

        match bucket {
            Some((q, tally)) => {
                tally.record(is_correct);
                Attribution::Question(q)
            }
            None => {
                tracing::warn!(
                    question = ?question,
                    is_correct,
                    "Quiz answer without a valid question number, counted in total only"
                );
                Attribution::TotalOnly
            }
        }
    }

    /// Answers counted in the total but not in any question bucket
    pub fn unattributed(&self) -> Tally {
        let (correct, incorrect) = self
            .questions
            .values()
            .fold((0u64, 0u64), |(c, i), t| (c + t.correct, i + t.incorrect));

        Tally {
            correct: self.total.correct.saturating_sub(correct),
            incorrect: self.total.incorrect.saturating_sub(incorrect),
        }
    }
}

impl Default for QuizStats {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTION_COUNT)
    }
}

impl Serialize for QuizStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.questions.len() + 1))?;
        map.serialize_entry("total", &self.total)?;
        for (question, tally) in &self.questions {
            map.serialize_entry(&format!("q{}", question), tally)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QuizStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;

        let mut total = None;
        let mut questions = BTreeMap::new();
        for (key, value) in raw {
            if key == "total" {
                total = Some(Tally::deserialize(value).map_err(D::Error::custom)?);
                continue;
            }

            match key.strip_prefix('q').and_then(|n| n.parse::<u32>().ok()) {
                Some(question) if question > 0 && format!("q{}", question) == key => {
                    let tally = Tally::deserialize(value).map_err(D::Error::custom)?;
                    questions.insert(question, tally);
                }
                _ => {
                    tracing::debug!(key = %key, "Ignoring unknown quiz stats key");
                }
            }
        }

        let total = total.ok_or_else(|| D::Error::missing_field("total"))?;
        Ok(Self { total, questions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_every_bucket() {
        let stats = QuizStats::new(10);
        assert_eq!(stats.total, Tally::default());
        for q in 1..=10 {
            assert_eq!(stats.question(q), Some(&Tally::default()));
        }
        assert_eq!(stats.question(11), None);
        assert_eq!(stats.question_count(), 10);
    }

    #[test]
    fn test_record_alternating_answers() {
        let mut stats = QuizStats::new(10);
        for i in 0..20 {
            let question = (i % 10) as i64 + 1;
            assert_eq!(
                stats.record_answer(Some(question), i % 2 == 0),
                Attribution::Question(question as u32)
            );
        }

        assert_eq!(stats.total, Tally { correct: 10, incorrect: 10 });
        let sum = stats
            .questions()
            .fold(0, |acc, (_, tally)| acc + tally.answered());
        assert_eq!(sum, stats.total.answered());
        assert_eq!(stats.unattributed(), Tally::default());
    }

    #[test]
    fn test_invalid_question_counts_total_only() {
        let mut stats = QuizStats::new(3);
        assert_eq!(stats.record_answer(None, true), Attribution::TotalOnly);
        assert_eq!(stats.record_answer(Some(0), false), Attribution::TotalOnly);
        assert_eq!(stats.record_answer(Some(4), true), Attribution::TotalOnly);
        assert_eq!(stats.record_answer(Some(-2), true), Attribution::TotalOnly);

        assert_eq!(stats.total, Tally { correct: 3, incorrect: 1 });
        assert!(stats.questions().all(|(_, t)| t.answered() == 0));
        assert_eq!(stats.unattributed(), Tally { correct: 3, incorrect: 1 });
    }

    #[test]
    fn test_resize_questions_keeps_existing() {
        let mut stats = QuizStats::new(2);
        stats.record_answer(Some(2), true);
        stats.resize_questions(5);

        assert_eq!(stats.question(2), Some(&Tally { correct: 1, incorrect: 0 }));
        assert_eq!(stats.question(5), Some(&Tally::default()));
    }

    #[test]
    fn test_shrinking_drops_buckets_above_count() {
        let mut stats = QuizStats::new(12);
        stats.record_answer(Some(11), true);
        stats.resize_questions(10);

        assert_eq!(stats.question_count(), 10);
        assert_eq!(stats.question(11), None);
        assert_eq!(stats.unattributed(), Tally { correct: 1, incorrect: 0 });
        assert_eq!(stats.record_answer(Some(11), true), Attribution::TotalOnly);
        assert_eq!(stats.question(11), None);
    }

    #[test]
    fn test_percent_correct() {
        assert_eq!(Tally::default().percent_correct(), None);
        assert_eq!(Tally { correct: 2, incorrect: 1 }.percent_correct(), Some(67));
        assert_eq!(Tally { correct: 1, incorrect: 0 }.percent_correct(), Some(100));
    }

    #[test]
    fn test_wire_shape() {
        let mut stats = QuizStats::new(2);
        stats.record_answer(Some(1), true);

        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "total": { "correct": 1, "incorrect": 0 },
                "q1": { "correct": 1, "incorrect": 0 },
                "q2": { "correct": 0, "incorrect": 0 }
            })
        );

        let back: QuizStats = serde_json::from_value(value).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn test_question_keys_in_numeric_order() {
        let json = serde_json::to_string(&QuizStats::new(10)).unwrap();
        let q2 = json.find("\"q2\"").unwrap();
        let q10 = json.find("\"q10\"").unwrap();
        assert!(q2 < q10);
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let stats: QuizStats = serde_json::from_str(
            r#"{"total":{"correct":1,"incorrect":1},"unknown":{"correct":1,"incorrect":0},"q1":{"correct":0,"incorrect":1}}"#,
        )
        .unwrap();
        assert_eq!(stats.question_count(), 1);
        assert_eq!(stats.unattributed(), Tally { correct: 1, incorrect: 0 });
    }

    #[test]
    fn test_deserialize_only_canonical_question_keys() {
        let stats: QuizStats = serde_json::from_str(
            r#"{"total":{"correct":3,"incorrect":0},"q01":{"correct":1,"incorrect":0},"q+1":{"correct":1,"incorrect":0},"q1":{"correct":1,"incorrect":0}}"#,
        )
        .unwrap();
        assert_eq!(stats.question_count(), 1);
        assert_eq!(stats.question(1), Some(&Tally { correct: 1, incorrect: 0 }));
        assert_eq!(stats.unattributed(), Tally { correct: 2, incorrect: 0 });
    }

    #[test]
    fn test_deserialize_requires_total() {
        let result: Result<QuizStats, _> = serde_json::from_str(r#"{"q1":{"correct":0,"incorrect":1}}"#);
        assert!(result.is_err());
    }
}
