//! Score reconciliation between two assessments.
//!
//! The rules are fixed:
//! 1. A directly recommended score is used verbatim.
//! 2. Otherwise `winner * confidence + loser * (1 - confidence)`, rounded to
//!    one decimal and held within the two input scores.
//! 3. No winner means no result. A winner is never invented.

use chrono::Utc;

use crate::extract::AdjudicationReading;
use crate::scores;
use crate::types::{AdjudicationResult, AssessmentRecord};

/// Interpolate between the winner's and loser's scores by confidence.
///
/// Confidence is clamped into [0.5, 1.0] first. The result always lies in
/// `[min(winner, loser), max(winner, loser)]`.
pub fn interpolate(winner_score: f64, loser_score: f64, confidence: f64) -> f64 {
    let confidence = scores::clamp_confidence(confidence);
    let blended = winner_score * confidence + loser_score * (1.0 - confidence);

    let low = winner_score.min(loser_score);
    let high = winner_score.max(loser_score);
    scores::round_one_decimal(blended).clamp(low, high)
}

/// Final score: the recommendation if given, else the interpolation.
pub fn final_score(
    winner_score: f64,
    loser_score: f64,
    confidence: f64,
    recommended: Option<f64>,
) -> f64 {
    recommended.unwrap_or_else(|| interpolate(winner_score, loser_score, confidence))
}

/// Whether two reality scores differ by more than `threshold`.
pub fn diverges(a: f64, b: f64, threshold: f64) -> bool {
    (a - b).abs() > threshold
}

/// Reconciled score for two agreeing assessments: their mean.
pub fn agreement_score(a: f64, b: f64) -> f64 {
    scores::round_one_decimal((a + b) / 2.0).clamp(a.min(b), a.max(b))
}

/// Turn an adjudication reading into a result.
///
/// Returns `None` when the reading names no winner.
pub fn resolve(
    reading: AdjudicationReading,
    a: &AssessmentRecord,
    b: &AssessmentRecord,
) -> Option<AdjudicationResult> {
    let winner = reading.winner?;
    let loser = winner.other();

    let winner_score = winner.pick(a, b).reality_score;
    let loser_score = loser.pick(a, b).reality_score;

    let final_score = final_score(
        winner_score,
        loser_score,
        reading.confidence,
        reading.recommended_score,
    );

    Some(AdjudicationResult {
        winner,
        confidence: reading.confidence,
        recommended_score: reading.recommended_score,
        final_score,
        criteria: reading.criteria,
        reasoning: reading.reasoning,
        adjudicated_at: Utc::now(),
    })
}
