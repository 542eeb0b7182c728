//! Tolerant label search over structured prose.
//!
//! Some replies are not JSON but prose carrying `LABEL: value` lines
//! ("WINNER: A", "CONFIDENCE: 0.8"). Labels match case-insensitively,
//! underscores in a label also match spaces, and the first occurrence wins.
//! Absent or unreadable fields fall back to the defaults documented on
//! [`AdjudicationReading`].

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

use crate::scores;
use crate::types::{Criterion, RecordId};

lazy_static! {
    static ref WINNER_LABEL: LabelPattern = LabelPattern::new(&["OVERALL_WINNER", "WINNER"]);
    static ref CONFIDENCE_LABEL: LabelPattern = LabelPattern::new(&["CONFIDENCE"]);
    static ref RECOMMENDED_LABEL: LabelPattern =
        LabelPattern::new(&["RECOMMENDED_SCORE", "FINAL_SCORE"]);
    static ref REASONING_LABEL: LabelPattern = LabelPattern::new(&["REASONING", "RATIONALE"]);
    static ref CRITERION_LABELS: Vec<(Criterion, LabelPattern)> = Criterion::ALL
        .iter()
        .map(|c| (*c, LabelPattern::new(&[c.label()])))
        .collect();

    static ref RECORD_REF: Regex = Regex::new(
        r"(?i)\A[\W_]*(?:assessment|record|option|response)?[\s_]*([ab])(?:\W|\z)"
    ).unwrap();

    static ref NUMBER: Regex =
        Regex::new(r"\A[\s*_]*([-+]?\d+(?:\.\d+)?|[-+]?\.\d+)\s*(%)?").unwrap();
}

/// A compiled `LABEL: value` matcher for one or more label aliases.
pub struct LabelPattern {
    regex: Regex,
}

impl LabelPattern {
    /// Build a matcher. Aliases are tried together; the earliest match in
    /// the text wins regardless of alias order.
    pub fn new(aliases: &[&str]) -> Self {
        let alternatives: Vec<String> = aliases
            .iter()
            .map(|alias| {
                alias
                    .split('_')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"[_\s]+")
            })
            .collect();

        let pattern = format!(
            r"(?i)(?:^|[^\w])(?:{})[\s*]*[:=][ \t*]*([^\n]*)",
            alternatives.join("|")
        );

        let regex = Regex::new(&pattern).expect("label aliases are escaped");
        Self { regex }
    }

    /// Value of the first occurrence, trimmed of markup. Empty values count
    /// as absent.
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        let value = self
            .regex
            .captures(text)?
            .get(1)?
            .as_str()
            .trim()
            .trim_matches('*')
            .trim();

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Read a record reference ("A", "Assessment B", "**b**").
///
/// Anything else, including "tie" or "neither", reads as `None`.
pub fn parse_record_ref(value: &str) -> Option<RecordId> {
    let caps = RECORD_REF.captures(value)?;
    match caps.get(1)?.as_str() {
        "a" | "A" => Some(RecordId::A),
        "b" | "B" => Some(RecordId::B),
        _ => None,
    }
}

/// Read the number a value starts with. A trailing `%` divides by 100.
///
/// Only markup may precede the number. A value that opens with words such
/// as "none" or "n/a" is `None` even when digits appear later in it.
pub fn parse_number(value: &str) -> Option<f64> {
    let caps = NUMBER.captures(value)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        Some(number / 100.0)
    } else {
        Some(number)
    }
}

/// Fields read from an adjudication reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjudicationReading {
    /// Overall winner. `None` when no `WINNER:` line names A or B; there is
    /// no default and callers must not invent one.
    pub winner: Option<RecordId>,

    /// Confidence clamped into [0.5, 1.0]. Defaults to
    /// [`scores::DEFAULT_ADJUDICATION_CONFIDENCE`] (0.5) when absent or
    /// unreadable.
    pub confidence: f64,

    /// Confidence exactly as written, before defaulting and clamping.
    pub raw_confidence: Option<f64>,

    /// Directly recommended score clamped into [-10, 10]. Defaults to
    /// `None` when absent or not numeric ("none", "n/a").
    pub recommended_score: Option<f64>,

    /// Per-criterion winners. Criteria that are absent or name neither
    /// record are left out.
    pub criteria: BTreeMap<Criterion, RecordId>,

    /// First line of the stated reasoning. Defaults to `None`.
    pub reasoning: Option<String>,
}

/// Read every adjudication field from structured prose.
pub fn read_adjudication(text: &str) -> AdjudicationReading {
    let winner = WINNER_LABEL.find(text).and_then(parse_record_ref);

    let raw_confidence = CONFIDENCE_LABEL.find(text).and_then(parse_number);
    let confidence = raw_confidence
        .map(scores::clamp_confidence)
        .unwrap_or(scores::DEFAULT_ADJUDICATION_CONFIDENCE);

    let recommended_score = RECOMMENDED_LABEL
        .find(text)
        .and_then(parse_number)
        .map(scores::clamp_reality);

    let criteria = CRITERION_LABELS
        .iter()
        .filter_map(|(criterion, label)| {
            label
                .find(text)
                .and_then(parse_record_ref)
                .map(|id| (*criterion, id))
        })
        .collect();

    let reasoning = REASONING_LABEL.find(text).map(str::to_string);

    AdjudicationReading {
        winner,
        confidence,
        raw_confidence,
        recommended_score,
        criteria,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "\
After comparing both assessments:

SOURCE_QUALITY: A
REASONING_RIGOR: B
EVIDENCE_COMPLETENESS: A
CALIBRATION: tie

WINNER: A
CONFIDENCE: 0.8
RECOMMENDED_SCORE: none
REASONING: A cites primary statistics; B relies on commentary.
";

    #[test]
    fn test_full_reply() {
        let reading = read_adjudication(REPLY);
        assert_eq!(reading.winner, Some(RecordId::A));
        assert_eq!(reading.confidence, 0.8);
        assert_eq!(reading.recommended_score, None);
        assert_eq!(reading.criteria.len(), 3);
        assert_eq!(reading.criteria[&Criterion::ReasoningRigor], RecordId::B);
        assert!(!reading.criteria.contains_key(&Criterion::Calibration));
        assert!(reading.reasoning.unwrap().starts_with("A cites"));
    }

    #[test]
    fn test_case_insensitive_and_markup() {
        let reading = read_adjudication("**Winner:** **Assessment B**\nconfidence = 90%");
        assert_eq!(reading.winner, Some(RecordId::B));
        assert_eq!(reading.confidence, 0.9);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let reading = read_adjudication("WINNER: B\nlater on... WINNER: A");
        assert_eq!(reading.winner, Some(RecordId::B));
    }

    #[test]
    fn test_label_inside_prose() {
        let reading = read_adjudication("On balance the WINNER: a, with CONFIDENCE: 0.65 overall.");
        assert_eq!(reading.winner, Some(RecordId::A));
        assert_eq!(reading.confidence, 0.65);
    }

    #[test]
    fn test_missing_confidence_defaults_to_floor() {
        let reading = read_adjudication("WINNER: A");
        assert_eq!(reading.confidence, 0.5);
        assert_eq!(reading.raw_confidence, None);

        let reading = read_adjudication("WINNER: A\nCONFIDENCE: high");
        assert_eq!(reading.confidence, 0.5);
    }

    #[test]
    fn test_low_confidence_clamped() {
        let reading = read_adjudication("WINNER: B\nCONFIDENCE: 0.2");
        assert_eq!(reading.raw_confidence, Some(0.2));
        assert_eq!(reading.confidence, 0.5);
    }

    #[test]
    fn test_tie_or_missing_winner_is_none() {
        assert_eq!(read_adjudication("WINNER: tie").winner, None);
        assert_eq!(read_adjudication("WINNER: neither").winner, None);
        assert_eq!(read_adjudication("I prefer the first one.").winner, None);
        assert_eq!(read_adjudication("").winner, None);
    }

    #[test]
    fn test_overall_winner_alias() {
        let reading = read_adjudication("OVERALL WINNER: B");
        assert_eq!(reading.winner, Some(RecordId::B));
    }

    #[test]
    fn test_criterion_label_does_not_shadow_winner() {
        let reading = read_adjudication("SOURCE_QUALITY: B\nWINNER: A");
        assert_eq!(reading.winner, Some(RecordId::A));
    }

    #[test]
    fn test_recommended_score_clamped() {
        let reading = read_adjudication("WINNER: A\nRECOMMENDED_SCORE: 14");
        assert_eq!(reading.recommended_score, Some(10.0));

        let reading = read_adjudication("WINNER: A\nRecommended score: -3.5");
        assert_eq!(reading.recommended_score, Some(-3.5));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0.8"), Some(0.8));
        assert_eq!(parse_number("75%"), Some(0.75));
        assert_eq!(parse_number("**0.9** (high)"), Some(0.9));
        assert_eq!(parse_number("-2"), Some(-2.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("about 75%"), None);
        assert_eq!(parse_number("none (the blend of 7 and 2 is fine)"), None);
        assert_eq!(parse_number("N/A, 4 would overstate it"), None);
    }

    #[test]
    fn test_recommended_none_with_digits_after() {
        let reading = read_adjudication(
            "WINNER: A\nCONFIDENCE: 0.8\nRECOMMENDED_SCORE: none (the blend of 7 and 2 is fine)",
        );
        assert_eq!(reading.winner, Some(RecordId::A));
        assert_eq!(reading.confidence, 0.8);
        assert_eq!(reading.recommended_score, None);
    }

    #[test]
    fn test_parse_record_ref() {
        assert_eq!(parse_record_ref("A"), Some(RecordId::A));
        assert_eq!(parse_record_ref("b."), Some(RecordId::B));
        assert_eq!(parse_record_ref("Record A (initial)"), Some(RecordId::A));
        assert_eq!(parse_record_ref("Assessment_B"), Some(RecordId::B));
        assert_eq!(parse_record_ref("both"), None);
        assert_eq!(parse_record_ref("and"), None);
    }
}
