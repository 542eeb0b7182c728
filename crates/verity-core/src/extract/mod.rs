//! Response extraction: untrusted service text in, validated data out.
//!
//! The external service is not trusted to return pure structured data.
//! Every reply goes through this module and nothing else in the workspace
//! reads raw service text.
//!
//! ## Algorithm
//!
//! 1. Empty or whitespace-only text is [`ExtractionOutcome::Empty`]; no parse
//!    is attempted.
//! 2. A fenced block tagged as JSON is preferred over the full text.
//! 3. Known wrapper markers are stripped.
//! 4. The body is parsed strictly and validated against the [`SchemaSpec`].
//! 5. If the strict parse fails, each balanced object or array in the body
//!    is tried in order. The first one that parses strictly and validates
//!    is the payload, so a citation like `[1]` ahead of it is skipped.
//! 6. Any failure is [`ExtractionOutcome::Malformed`] carrying the original
//!    text and the parse error. Partial data is never coerced into a record.
//!
//! Prose replies with `LABEL: value` lines use the tolerant search in
//! [`labels`] instead.

pub mod labels;
mod locate;
mod schema;

pub use labels::{read_adjudication, AdjudicationReading, LabelPattern};
pub use schema::{BuiltinSchema, SchemaError, SchemaSpec};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of extracting a payload from a reply.
///
/// Never panics or errors past the extractor: every input maps to exactly
/// one variant and callers must handle all three.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome<T> {
    /// The payload parsed and validated.
    Success(T),

    /// The reply had content but no usable payload.
    Malformed { raw: String, error: String },

    /// The reply was empty or whitespace.
    Empty,
}

impl<T> ExtractionOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    /// Transform the payload, keeping failure variants.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionOutcome<U> {
        match self {
            ExtractionOutcome::Success(payload) => ExtractionOutcome::Success(f(payload)),
            ExtractionOutcome::Malformed { raw, error } => ExtractionOutcome::Malformed { raw, error },
            ExtractionOutcome::Empty => ExtractionOutcome::Empty,
        }
    }

    /// The payload, if extraction succeeded.
    pub fn success(self) -> Option<T> {
        match self {
            ExtractionOutcome::Success(payload) => Some(payload),
            _ => None,
        }
    }
}

/// A payload plus the free text that surrounded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub payload: T,

    /// Narrative outside the structured block, trimmed; empty if none
    pub residual: String,
}

/// Extract and validate a JSON payload.
pub fn extract(raw: &str, schema: &SchemaSpec) -> ExtractionOutcome<Value> {
    extract_with_residual(raw, schema).map(|extracted| extracted.payload)
}

/// Extract a payload and keep the surrounding free text.
pub fn extract_with_residual(raw: &str, schema: &SchemaSpec) -> ExtractionOutcome<Extracted<Value>> {
    if raw.trim().is_empty() {
        return ExtractionOutcome::Empty;
    }

    let located = locate::locate(raw);

    let (payload, residual) = match serde_json::from_str::<Value>(&located.body) {
        Ok(payload) => {
            if let Err(errors) = schema.validate(&payload) {
                return malformed(raw, violation(schema, &errors));
            }
            (payload, located.residual)
        }
        Err(strict_error) => match embedded_payload(&located.body, schema) {
            Ok((payload, around)) => (payload, locate::join_residual(&located.residual, &around)),
            Err(rejected) => {
                return malformed(raw, rejected.unwrap_or_else(|| strict_error.to_string()))
            }
        },
    };

    ExtractionOutcome::Success(Extracted { payload, residual })
}

/// Extract, validate, and deserialize into `T`.
pub fn extract_typed<T: DeserializeOwned>(raw: &str, schema: &SchemaSpec) -> ExtractionOutcome<T> {
    match extract_typed_with_residual(raw, schema) {
        ExtractionOutcome::Success(extracted) => ExtractionOutcome::Success(extracted.payload),
        ExtractionOutcome::Malformed { raw, error } => ExtractionOutcome::Malformed { raw, error },
        ExtractionOutcome::Empty => ExtractionOutcome::Empty,
    }
}

/// Extract, validate, and deserialize into `T`, keeping the residual text.
pub fn extract_typed_with_residual<T: DeserializeOwned>(
    raw: &str,
    schema: &SchemaSpec,
) -> ExtractionOutcome<Extracted<T>> {
    match extract_with_residual(raw, schema) {
        ExtractionOutcome::Success(Extracted { payload, residual }) => {
            match serde_json::from_value::<T>(payload) {
                Ok(payload) => ExtractionOutcome::Success(Extracted { payload, residual }),
                Err(e) => malformed(raw, e.to_string()),
            }
        }
        ExtractionOutcome::Malformed { raw, error } => ExtractionOutcome::Malformed { raw, error },
        ExtractionOutcome::Empty => ExtractionOutcome::Empty,
    }
}

/// Strictly parse the first balanced object in prose, returning the text
/// around it.
/// First balanced span in `body` that parses and satisfies `schema`, with
/// the text around it.
///
/// On failure returns the schema violation of the first span that parsed,
/// if any did.
fn embedded_payload(body: &str, schema: &SchemaSpec) -> Result<(Value, String), Option<String>> {
    let mut first_violation = None;

    for span in locate::balanced_spans(body) {
        let Ok(payload) = serde_json::from_str::<Value>(&body[span.clone()]) else {
            continue;
        };
        match schema.validate(&payload) {
            Ok(()) => {
                let around = locate::join_residual(&body[..span.start], &body[span.end..]);
                return Ok((payload, around));
            }
            Err(errors) => {
                first_violation.get_or_insert_with(|| violation(schema, &errors));
            }
        }
    }

    Err(first_violation)
}

fn violation(schema: &SchemaSpec, errors: &[String]) -> String {
    format!("schema '{}' violated: {}", schema.name(), errors.join("; "))
}

fn malformed<T>(raw: &str, error: String) -> ExtractionOutcome<T> {
    ExtractionOutcome::Malformed {
        raw: raw.to_string(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssessmentRecord;
    use proptest::prelude::*;
    use serde_json::json;

    fn assessment_schema() -> &'static SchemaSpec {
        BuiltinSchema::Assessment.spec().unwrap()
    }

    fn any_schema() -> SchemaSpec {
        SchemaSpec::new("any", &json!({})).unwrap()
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(extract("", &any_schema()), ExtractionOutcome::Empty);
        assert_eq!(extract(" \n\t ", &any_schema()), ExtractionOutcome::Empty);
    }

    #[test]
    fn test_clean_json() {
        let outcome = extract(r#"{"reality_score": 3, "rationale": "ok"}"#, assessment_schema());
        assert_eq!(
            outcome,
            ExtractionOutcome::Success(json!({"reality_score": 3, "rationale": "ok"}))
        );
    }

    #[test]
    fn test_fenced_json_in_prose() {
        let raw = "Let me assess this.\n\n```json\n{\"reality_score\": -4.5, \"rationale\": \"contradicted by census data\"}\n```\n\nLet me know if you need more.";
        let record: AssessmentRecord = extract_typed(raw, assessment_schema()).success().unwrap();
        assert_eq!(record.reality_score, -4.5);
        assert_eq!(record.rationale, "contradicted by census data");
    }

    #[test]
    fn test_object_with_commentary_around_it() {
        let raw = "Here you go: {\"reality_score\": 2, \"rationale\": \"mixed\"} -- end";
        let outcome = extract_with_residual(raw, assessment_schema());
        match outcome {
            ExtractionOutcome::Success(extracted) => {
                assert_eq!(extracted.payload["reality_score"], 2);
                assert_eq!(extracted.residual, "Here you go:\n\n-- end");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_citation_brackets_before_object() {
        let raw = "Based on sources [1] and [2], my assessment: {\"reality_score\": 3, \"rationale\": \"x\"}";
        match extract_with_residual(raw, assessment_schema()) {
            ExtractionOutcome::Success(extracted) => {
                assert_eq!(extracted.payload, json!({"reality_score": 3, "rationale": "x"}));
                assert_eq!(extracted.residual, "Based on sources [1] and [2], my assessment:");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_embedded_violation_is_reported() {
        let raw = "Sources [1]. Result: {\"rationale\": \"no score\"}";
        match extract(raw, assessment_schema()) {
            ExtractionOutcome::Malformed { error, .. } => {
                assert!(error.starts_with("schema 'assessment' violated"));
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_prose_is_malformed() {
        let raw = "I think this claim is mostly true.";
        match extract(raw, &any_schema()) {
            ExtractionOutcome::Malformed { raw: kept, error } => {
                assert_eq!(kept, raw);
                assert!(!error.is_empty());
            }
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_block_is_malformed() {
        let raw = "```json\n{\"reality_score\": 7, \"rationale\": \"cut o";
        assert!(matches!(
            extract(raw, assessment_schema()),
            ExtractionOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn test_schema_violation_is_malformed() {
        let raw = r#"{"rationale": "forgot the score"}"#;
        match extract(raw, assessment_schema()) {
            ExtractionOutcome::Malformed { error, .. } => assert!(error.contains("assessment")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_types_not_coerced() {
        let raw = r#"{"reality_score": "seven", "rationale": "x"}"#;
        assert!(matches!(
            extract_typed::<AssessmentRecord>(raw, assessment_schema()),
            ExtractionOutcome::Malformed { .. }
        ));
    }

    #[test]
    fn test_residual_narrative_after_block() {
        let raw = "```json\n{\"counterarguments\": [\"sampling bias\"], \"robustness\": 0.6}\n```\nThe strongest objection is that the survey sample skews urban.";
        let schema = BuiltinSchema::StressTest.spec().unwrap();
        match extract_with_residual(raw, schema) {
            ExtractionOutcome::Success(extracted) => {
                assert_eq!(extracted.payload["robustness"], 0.6);
                assert!(extracted.residual.starts_with("The strongest objection"));
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_outcome_map_keeps_failures() {
        let outcome: ExtractionOutcome<i32> = ExtractionOutcome::Empty;
        assert_eq!(outcome.map(|v| v + 1), ExtractionOutcome::Empty);
        assert_eq!(ExtractionOutcome::Success(1).map(|v| v + 1).success(), Some(2));
    }

    fn arb_record() -> impl Strategy<Value = AssessmentRecord> {
        (
            -100i32..=100,
            proptest::option::of(-10i32..=10),
            "[a-zA-Z0-9 ,.{}\"]{1,40}",
            proptest::collection::vec("[a-z_]{1,12}", 0..4),
        )
            .prop_map(|(reality, integrity, rationale, patterns)| AssessmentRecord {
                reality_score: reality as f64 / 10.0,
                integrity_score: integrity.map(|i| i as f64 / 10.0),
                rationale,
                distortion_patterns: patterns,
            })
    }

    proptest! {
        #[test]
        fn prop_extract_never_panics(raw in any::<String>()) {
            let outcome = extract(&raw, &any_schema());
            let ok = matches!(
                outcome,
                ExtractionOutcome::Success(_) | ExtractionOutcome::Malformed { .. } | ExtractionOutcome::Empty
            );
            prop_assert!(ok);
        }

        #[test]
        fn prop_extract_never_panics_on_json_like(raw in "[{}\\[\\]\":,a-z0-9 \n`]{0,60}") {
            let _ = extract_with_residual(&raw, assessment_schema());
        }

        #[test]
        fn prop_clean_payload_is_idempotent(record in arb_record()) {
            let serialized = serde_json::to_string(&record).unwrap();
            let outcome = extract_typed::<AssessmentRecord>(&serialized, assessment_schema());
            prop_assert_eq!(outcome, ExtractionOutcome::Success(record));
        }
    }
}
