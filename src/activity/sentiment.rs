use serde::{Deserialize, Serialize};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "awesome", "excellent", "happy", "love", "wonderful", "best", "better",
    "fun", "exciting", "glad", "nice", "cool", "amazing", "fantastic", "brilliant", "joy",
    "success", "win", "learning", "fast", "easy", "smart",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "worst", "hate", "sad", "angry", "boring", "difficult", "hard",
    "fail", "lose", "poor", "wrong", "ugly", "nasty", "horrible", "scary", "fear", "pain",
    "slow", "confusing", "stuck",
];

/// Result of scoring a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub score: i32,
}

/// Polarity bucket derived from the sign of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s > 0 => Tone::Positive,
            s if s < 0 => Tone::Negative,
            _ => Tone::Neutral,
        }
    }

    /// Bubble fill colour for this tone
    pub fn color(&self) -> &'static str {
        match self {
            Tone::Positive => "#81c784",
            Tone::Negative => "#e57373",
            Tone::Neutral => "#fff176",
        }
    }
}

/// Bag-of-words scorer over two fixed word lists.
///
/// Each token found in the positive list adds one, each token found in the
/// negative list subtracts one. There is no normalisation by length.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, text: &str) -> SentimentScore {
        let lowered = text.to_lowercase();
        let score = tokens(&lowered)
            .map(|word| {
                if POSITIVE_WORDS.contains(&word) {
                    1
                } else if NEGATIVE_WORDS.contains(&word) {
                    -1
                } else {
                    0
                }
            })
            .sum();

        SentimentScore { score }
    }
}

/// Maximal runs of ASCII word characters (`[A-Za-z0-9_]`)
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_neutral() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze("").score, 0);
        assert_eq!(analyzer.analyze("   ").score, 0);
    }

    #[test]
    fn test_positive_and_negative_cancel() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze("great but hard").score, 0);
    }

    #[test]
    fn test_case_insensitive_and_repeats_count() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze("GREAT great Great!").score, 3);
        assert_eq!(analyzer.analyze("This is BORING and confusing").score, -2);
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze("fun,fast;easy...").score, 3);
        // "hardware" is one token, not "hard"
        assert_eq!(analyzer.analyze("hardware").score, 0);
        assert_eq!(analyzer.analyze("not_good").score, 0);
    }

    #[test]
    fn test_word_lists_are_disjoint() {
        for word in POSITIVE_WORDS {
            assert!(!NEGATIVE_WORDS.contains(word), "{} is in both lists", word);
        }
    }

    #[test]
    fn test_tone_from_score() {
        assert_eq!(Tone::from_score(2), Tone::Positive);
        assert_eq!(Tone::from_score(-1), Tone::Negative);
        assert_eq!(Tone::from_score(0), Tone::Neutral);
        assert_eq!(Tone::Positive.color(), "#81c784");
    }

    #[test]
    fn test_score_serializes_as_object() {
        let json = serde_json::to_string(&SentimentScore { score: -2 }).unwrap();
        assert_eq!(json, r#"{"score":-2}"#);
    }
}
