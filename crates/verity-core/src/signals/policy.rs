//! Pluggable refinement of a classification decision.
//!
//! The defensive and mirrored variants hinge on contempt detection. Where
//! that is evaluated is a policy: [`ServiceSignals`] trusts the service's
//! own judgement, [`RuleSignals`] overlays the deterministic detectors.

use serde::{Deserialize, Serialize};

use super::patterns::SignalScan;
use crate::types::{ClaimInput, Routing, Track, TrackDecision};

/// Refines a decision produced by the classification service.
///
/// # Contract
/// - MUST NOT change a verification decision into exploration or back
/// - MUST NOT turn a clarification request into a routed decision
/// - MAY escalate plain exploration to the defensive or mirrored variant
/// - MAY append signal labels
pub trait SignalPolicy: Send + Sync {
    /// Policy name for logs.
    fn name(&self) -> &'static str;

    fn refine(&self, claim: &ClaimInput, decision: TrackDecision) -> TrackDecision;
}

/// Which policy to use, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPolicyKind {
    /// Trust the service's track verbatim.
    Service,
    /// Overlay deterministic detectors.
    #[default]
    Rules,
}

impl SignalPolicyKind {
    pub fn build(&self) -> Box<dyn SignalPolicy> {
        match self {
            SignalPolicyKind::Service => Box::new(ServiceSignals),
            SignalPolicyKind::Rules => Box::new(RuleSignals),
        }
    }
}

/// Leaves the service decision untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceSignals;

impl SignalPolicy for ServiceSignals {
    fn name(&self) -> &'static str {
        "service"
    }

    fn refine(&self, _claim: &ClaimInput, decision: TrackDecision) -> TrackDecision {
        decision
    }
}

/// Deterministic overlay: detected communication signals escalate plain
/// exploration and are recorded on the decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSignals;

impl SignalPolicy for RuleSignals {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn refine(&self, claim: &ClaimInput, mut decision: TrackDecision) -> TrackDecision {
        let track = match decision.routing() {
            Routing::Routed(track) if track.is_exploration() => track,
            _ => return decision,
        };

        let scan = SignalScan::scan(claim.text());
        for label in scan.communication_labels() {
            decision.push_signal(label);
        }

        if track == Track::NormativeExploration {
            if let Some(escalated) = scan.escalation() {
                tracing::warn!(
                    from = %track,
                    to = %escalated,
                    signals = ?decision.signals,
                    "Communication signals escalated exploration track"
                );
                decision.track = Some(escalated);
            }
        }

        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(text: &str) -> ClaimInput {
        ClaimInput::new(text).unwrap()
    }

    #[test]
    fn test_rules_escalate_plain_exploration() {
        let decision = TrackDecision::routed(Track::NormativeExploration, 0.8, "contested");
        let refined = RuleSignals.refine(&claim("Wake up, sheeple. Our side is right."), decision);
        assert_eq!(refined.track, Some(Track::NormativeExplorationDefensive));
        assert!(refined.signals.iter().any(|s| s == "reality_distortion"));
        assert!(refined.signals.iter().any(|s| s == "tribal_loyalty"));
    }

    #[test]
    fn test_rules_never_touch_verification() {
        let decision = TrackDecision::routed(Track::FactualVerification, 0.9, "checkable");
        let refined = RuleSignals.refine(
            &claim("Everyone knows vaccines cause autism, wake up"),
            decision.clone(),
        );
        assert_eq!(refined, decision);
    }

    #[test]
    fn test_rules_never_touch_clarification() {
        let decision = TrackDecision::clarify(0.2, vec!["What do you mean?".into()], "too short");
        let refined = RuleSignals.refine(&claim("idiots"), decision.clone());
        assert_eq!(refined, decision);
    }

    #[test]
    fn test_rules_do_not_swap_variants() {
        let decision = TrackDecision::routed(Track::NormativeExplorationMirrored, 0.7, "tone");
        let refined = RuleSignals.refine(&claim("Fake news, all of it, and these idiots buy it"), decision);
        assert_eq!(refined.track, Some(Track::NormativeExplorationMirrored));
        assert!(refined.signals.iter().any(|s| s == "source_dismissal"));
    }

    #[test]
    fn test_service_policy_is_identity() {
        let decision = TrackDecision::routed(Track::NormativeExploration, 0.8, "contested");
        let refined = ServiceSignals.refine(&claim("Wake up, sheeple."), decision.clone());
        assert_eq!(refined, decision);
    }

    #[test]
    fn test_policy_kind_builds() {
        assert_eq!(SignalPolicyKind::default(), SignalPolicyKind::Rules);
        assert_eq!(SignalPolicyKind::Service.build().name(), "service");
        assert_eq!(SignalPolicyKind::Rules.build().name(), "rules");
    }
}
