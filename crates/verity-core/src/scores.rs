//! Score ranges and field defaults.
//!
//! Every bounded number that crosses the service boundary is defined here
//! once. Call sites clamp through these helpers instead of re-deriving
//! bounds or defaults locally.

/// Lowest reality score (claim has no factual grounding).
pub const REALITY_MIN: f64 = -10.0;

/// Highest reality score (claim is fully grounded).
pub const REALITY_MAX: f64 = 10.0;

/// Lowest integrity score (presentation is dishonest).
pub const INTEGRITY_MIN: f64 = -1.0;

/// Highest integrity score (presentation is transparent).
pub const INTEGRITY_MAX: f64 = 1.0;

/// Lowest adjudication confidence that is ever reported.
///
/// An adjudicator below 50% has not distinguished the two records, so the
/// floor is reported instead of the unreliable value.
pub const CONFIDENCE_FLOOR: f64 = 0.5;

/// Highest adjudication confidence.
pub const CONFIDENCE_CEILING: f64 = 1.0;

/// Adjudication confidence used when the reply carries none or it cannot be read.
///
/// Equal to the floor: "uncertain, do not trust numerically".
pub const DEFAULT_ADJUDICATION_CONFIDENCE: f64 = CONFIDENCE_FLOOR;

/// Classification confidence below which a decision carrying clarifying
/// questions is treated as a request for clarification.
pub const CLARIFICATION_CONFIDENCE: f64 = 0.4;

/// Default reality-score gap above which two assessments are divergent.
pub const DEFAULT_DIVERGENCE_THRESHOLD: f64 = 2.0;

/// Clamp `value` into `[min, max]`, warning when it had to move.
///
/// Non-finite values collapse to the nearest bound (`NaN` to `min`) so that
/// nothing outside the protocol range ever passes through.
pub fn clamp_field(field: &'static str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    };

    if clamped != value {
        tracing::warn!(field, value, clamped, "Value outside protocol range, clamped");
    }

    clamped
}

/// Clamp a reality score into `[REALITY_MIN, REALITY_MAX]`.
pub fn clamp_reality(value: f64) -> f64 {
    clamp_field("reality_score", value, REALITY_MIN, REALITY_MAX)
}

/// Clamp an integrity score into `[INTEGRITY_MIN, INTEGRITY_MAX]`.
pub fn clamp_integrity(value: f64) -> f64 {
    clamp_field("integrity_score", value, INTEGRITY_MIN, INTEGRITY_MAX)
}

/// Clamp an adjudication confidence into `[CONFIDENCE_FLOOR, CONFIDENCE_CEILING]`.
pub fn clamp_confidence(value: f64) -> f64 {
    clamp_field("confidence", value, CONFIDENCE_FLOOR, CONFIDENCE_CEILING)
}

/// Clamp a classification confidence into `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    clamp_field("classification_confidence", value, 0.0, 1.0)
}

/// Round to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
