//! # verity-core
//!
//! Deterministic building blocks for claim evaluation.
//!
//! This crate never calls an external service. It owns the parts of the
//! pipeline that must behave the same way on every run:
//!
//! - **Types**: claims, track decisions, assessment records, verdicts
//! - **Extraction**: structured payloads out of free-form service responses
//! - **Reconciliation**: one final score from two diverging assessments
//! - **Signals**: communication-signal detection and offline routing
//! - **Lifecycle**: the legal state transitions of a claim
//!
//! The service-backed classifier, assessor and adjudicator live in
//! `verity-runtime` and are built from these pieces.
//!
//! ## Example
//!
//! ```rust
//! use verity_core::extract::read_adjudication;
//! use verity_core::reconcile::resolve;
//! use verity_core::AssessmentRecord;
//!
//! let a = AssessmentRecord::new(7.0, "initial pass");
//! let b = AssessmentRecord::new(2.0, "verify pass");
//!
//! let reading = read_adjudication("WINNER: A\nCONFIDENCE: 0.8");
//! let result = resolve(reading, &a, &b).unwrap();
//! assert_eq!(result.final_score, 6.0);
//! ```

pub mod extract;
pub mod lifecycle;
pub mod reconcile;
pub mod scores;
pub mod signals;
pub mod types;

pub use extract::{ExtractionOutcome, Extracted};
pub use lifecycle::{ClaimState, Lifecycle, TransitionError};
pub use signals::{HeuristicClassifier, SignalPolicy, SignalPolicyKind};
pub use types::{
    AdjudicationResult, AssessmentPass, AssessmentRecord, ClaimInput, ComponentKind, Criterion,
    InputError, MixedComponents, RecordId, ReconcileMethod, Routing, Track, TrackDecision, Verdict,
};
