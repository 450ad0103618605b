//! Versioned persistence for [`QuizStats`].
//!
//! Stored form is `{"version": N, "data": ...}`. Older stores hold either the
//! flat `{correct, incorrect}` tally (version 0) or the bare structured shape
//! (version 1). Each entry of [`MIGRATIONS`] lifts data by one version.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::stats::{QuizStats, Tally};
use crate::error::{DeckError, Result};

pub const CURRENT_VERSION: u32 = 2;

type Migration = fn(Value) -> Result<Value>;

/// `MIGRATIONS[v]` upgrades version `v` data to version `v + 1`
const MIGRATIONS: [Migration; CURRENT_VERSION as usize] = [flat_to_structured, structured_to_enveloped];

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

/// Wrap stats in the current envelope
pub fn encode(stats: &QuizStats) -> Result<String> {
    let envelope = Envelope {
        version: CURRENT_VERSION,
        data: serde_json::to_value(stats)?,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Read any known stored shape and bring it up to date.
///
/// Legacy flat tallies keep their totals but every question bucket starts
/// at zero. Afterwards the buckets are exactly `1..=question_count`.
pub fn migrate(raw: &str, question_count: u32) -> Result<QuizStats> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DeckError::MalformedState(format!("quiz stats are not JSON: {}", e)))?;

    let (mut version, mut data) = detect_version(value)?;
    if version > CURRENT_VERSION {
        return Err(DeckError::UnsupportedSchemaVersion(version));
    }

    while version < CURRENT_VERSION {
        tracing::info!(from = version, to = version + 1, "Migrating quiz stats");
        data = MIGRATIONS[version as usize](data)?;
        version += 1;
    }

    let mut stats: QuizStats = serde_json::from_value(data)
        .map_err(|e| DeckError::MalformedState(format!("quiz stats have the wrong shape: {}", e)))?;
    stats.resize_questions(question_count);
    Ok(stats)
}

fn detect_version(value: Value) -> Result<(u32, Value)> {
    let Value::Object(ref fields) = value else {
        return Err(DeckError::MalformedState("quiz stats are not an object".to_string()));
    };

    if fields.contains_key("version") {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| DeckError::MalformedState(format!("bad envelope: {}", e)))?;
        return Ok((envelope.version, envelope.data));
    }

    if fields.contains_key("total") {
        Ok((1, value))
    } else {
        Ok((0, value))
    }
}

fn flat_to_structured(data: Value) -> Result<Value> {
    let total: Tally = serde_json::from_value(data)
        .map_err(|e| DeckError::MalformedState(format!("bad legacy tally: {}", e)))?;
    tracing::warn!(
        correct = total.correct,
        incorrect = total.incorrect,
        "Upgrading legacy quiz totals, per-question results cannot be recovered"
    );
    Ok(json!({ "total": total }))
}

fn structured_to_enveloped(data: Value) -> Result<Value> {
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Attribution;

    #[test]
    fn test_legacy_flat_shape() {
        let stats = migrate(r#"{"correct":3,"incorrect":2}"#, 10).unwrap();
        assert_eq!(stats.total, Tally { correct: 3, incorrect: 2 });
        for q in 1..=10 {
            assert_eq!(stats.question(q), Some(&Tally::default()));
        }
    }

    #[test]
    fn test_unversioned_structured_shape() {
        let stats = migrate(
            r#"{"total":{"correct":1,"incorrect":0},"q1":{"correct":1,"incorrect":0}}"#,
            3,
        )
        .unwrap();
        assert_eq!(stats.question(1), Some(&Tally { correct: 1, incorrect: 0 }));
        assert_eq!(stats.question(3), Some(&Tally::default()));
    }

    #[test]
    fn test_encode_then_migrate_grows_question_count() {
        let mut stats = QuizStats::new(5);
        stats.record_answer(Some(5), false);

        let stored = encode(&stats).unwrap();
        assert!(stored.starts_with(r#"{"version":2"#));

        let loaded = migrate(&stored, 8).unwrap();
        assert_eq!(loaded.question(5), Some(&Tally { correct: 0, incorrect: 1 }));
        assert_eq!(loaded.question_count(), 8);
    }

    #[test]
    fn test_migrate_to_fewer_questions_drops_stale_buckets() {
        let stored = encode(&QuizStats::new(12)).unwrap();
        let mut loaded = migrate(&stored, 10).unwrap();

        assert_eq!(loaded.question_count(), 10);
        assert_eq!(loaded.question(11), None);
        assert_eq!(loaded.record_answer(Some(11), true), Attribution::TotalOnly);
        assert!(!serde_json::to_string(&loaded).unwrap().contains("q11"));
    }

    #[test]
    fn test_future_version_rejected() {
        let result = migrate(r#"{"version":9,"data":{}}"#, 10);
        assert!(matches!(result, Err(DeckError::UnsupportedSchemaVersion(9))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(migrate("not json", 10), Err(DeckError::MalformedState(_))));
        assert!(matches!(migrate("[1,2]", 10), Err(DeckError::MalformedState(_))));
        assert!(matches!(
            migrate(r#"{"correct":"many"}"#, 10),
            Err(DeckError::MalformedState(_))
        ));
    }
}
