//! Offline heuristic classifier.
//!
//! A deterministic rendition of the routing policy built on the same
//! detectors as [`RuleSignals`](super::RuleSignals). It never calls the
//! service, so it serves offline use and regression checks of the policy.

use super::patterns::SignalScan;
use crate::types::{ClaimInput, ComponentKind, MixedComponents, Track, TrackDecision};

/// Confidence reported when the text is too short to classify.
const SHORT_TEXT_CONFIDENCE: f64 = 0.2;

/// Confidence reported when no framing is detected at all.
const UNFRAMED_CONFIDENCE: f64 = 0.3;

/// Confidence reported for mixed empirical/normative claims.
const MIXED_CONFIDENCE: f64 = 0.6;

/// Deterministic track classifier.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    /// Fewer words than this asks for clarification
    pub min_words: usize,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self { min_words: 3 }
    }
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a claim without any service call.
    pub fn classify(&self, claim: &ClaimInput) -> TrackDecision {
        let text = claim.text().trim();

        if word_count(text) < self.min_words {
            return TrackDecision::clarify(
                SHORT_TEXT_CONFIDENCE,
                vec![
                    format!("What specifically would you like examined about \"{}\"?", text),
                    "Are you asking whether something is true, or what to make of it?".to_string(),
                ],
                "Too short to classify reliably.",
            );
        }

        let scan = SignalScan::scan(text);

        if let Some(components) = mixed_components(text) {
            return self.mixed_decision(&scan, components);
        }

        let factual = scan.factual_weight();
        let normative = scan.normative_weight();

        if factual == 0 && normative == 0 {
            return TrackDecision::clarify(
                UNFRAMED_CONFIDENCE,
                vec![
                    "What claim would you like examined?".to_string(),
                    "Is there a specific fact you want checked, or a question of values?"
                        .to_string(),
                ],
                "No factual or value-laden framing detected.",
            );
        }

        let explicit_check = scan.factual.contains(&"verification_request");
        let exploration = normative > factual || (normative == factual && !explicit_check);

        let mut decision = if exploration {
            let margin = normative.saturating_sub(factual).min(3) as f64;
            let track = scan.escalation().unwrap_or(Track::NormativeExploration);
            TrackDecision::routed(track, 0.55 + 0.1 * margin, explanation(track))
        } else {
            let margin = factual.saturating_sub(normative).min(3) as f64;
            TrackDecision::routed(
                Track::FactualVerification,
                0.6 + 0.1 * margin,
                explanation(Track::FactualVerification),
            )
        };

        record_signals(&mut decision, &scan);
        decision
    }

    fn mixed_decision(&self, scan: &SignalScan, components: MixedComponents) -> TrackDecision {
        let track = match components.lead {
            ComponentKind::Empirical => Track::FactualVerification,
            ComponentKind::Normative => scan.escalation().unwrap_or(Track::NormativeExploration),
        };

        let lead = match components.lead {
            ComponentKind::Empirical => "empirical",
            ComponentKind::Normative => "normative",
        };

        let mut decision = TrackDecision::routed(
            track,
            MIXED_CONFIDENCE,
            format!(
                "Mixes an empirical claim and a normative claim; start with the {} part.",
                lead
            ),
        );
        decision.components = Some(components);
        record_signals(&mut decision, scan);
        decision
    }
}

fn explanation(track: Track) -> &'static str {
    match track {
        Track::FactualVerification => "Framed as an empirically checkable claim.",
        Track::NormativeExploration => "Value-laden or contested; perspectives will be explored.",
        Track::NormativeExplorationDefensive => {
            "Contested, and framed with weaponized-communication signals."
        }
        Track::NormativeExplorationMirrored => {
            "The position may be supportable, but it is delivered with contempt for those who disagree."
        }
    }
}

fn record_signals(decision: &mut TrackDecision, scan: &SignalScan) {
    let labels = scan
        .factual
        .iter()
        .chain(scan.normative.iter())
        .copied()
        .chain(scan.communication_labels());
    for label in labels {
        decision.push_signal(label);
    }
    if scan.uncertainty {
        decision.push_signal("asker_uncertainty");
    }
}

/// Split a claim into both parts when one sentence is purely empirical and
/// another purely normative.
///
/// Emphasis is the sentence's framing weight plus one when the asker poses
/// it as a question. Ties lead with the empirical part.
fn mixed_components(text: &str) -> Option<MixedComponents> {
    let mut empirical: Option<(&str, usize)> = None;
    let mut normative: Option<(&str, usize)> = None;

    for segment in segments(text) {
        let scan = SignalScan::scan(segment);
        let asked = usize::from(segment.trim_end().ends_with('?'));
        let value_laden = !scan.normative.is_empty() || scan.uncertainty;

        if scan.factual_weight() > 0 && !value_laden {
            let emphasis = scan.factual_weight() + asked;
            if empirical.map_or(true, |(_, best)| emphasis > best) {
                empirical = Some((segment, emphasis));
            }
        } else if value_laden && scan.factual_weight() == 0 {
            let emphasis = scan.normative_weight() + asked;
            if normative.map_or(true, |(_, best)| emphasis > best) {
                normative = Some((segment, emphasis));
            }
        }
    }

    let ((empirical, e_weight), (normative, n_weight)) = (empirical?, normative?);
    let lead = if n_weight > e_weight {
        ComponentKind::Normative
    } else {
        ComponentKind::Empirical
    };

    Some(MixedComponents {
        empirical: empirical.trim().to_string(),
        normative: normative.trim().to_string(),
        lead,
    })
}

/// Sentences, cut after `.`, `?`, `!` or `;` followed by whitespace or the end.
fn segments(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if matches!(ch, '.' | '?' | '!' | ';') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + ch.len_utf8();
                let segment = text[start..end].trim();
                if !segment.is_empty() {
                    out.push(segment);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .count()
}
