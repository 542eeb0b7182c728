//! Communication-signal detection and routing policy.
//!
//! - [`SignalScan`] runs the regex detectors over a claim
//! - [`SignalPolicy`] refines a service decision with those detections
//! - [`HeuristicClassifier`] routes a claim with no service at all

mod heuristic;
mod patterns;
mod policy;

pub use heuristic::HeuristicClassifier;
pub use patterns::SignalScan;
pub use policy::{RuleSignals, ServiceSignals, SignalPolicy, SignalPolicyKind};
