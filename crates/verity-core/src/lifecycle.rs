//! Per-claim lifecycle.
//!
//! ```text
//! Received -> Classifying -> Routed | NeedsClarification | ClassificationFailed
//! NeedsClarification -> Classifying                      (re-submission)
//! Routed -> AssessingInitial -> AssessingVerify | Reconciled | Failed
//! AssessingVerify -> Reconciled | Adjudicating | Failed
//! Adjudicating -> Reconciled | AdjudicationIndeterminate | Failed
//! ```
//!
//! `Failed` covers transport or extraction failures during assessment and
//! adjudication. Only `NeedsClarification` permits re-entry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// States a claim moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    Received,
    Classifying,
    Routed,
    NeedsClarification,
    ClassificationFailed,
    AssessingInitial,
    AssessingVerify,
    Adjudicating,
    Reconciled,
    AdjudicationIndeterminate,
    Failed,
}

impl ClaimState {
    /// Terminal states end the lifecycle. `NeedsClarification` is terminal
    /// for one run but may restart on re-submission.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimState::NeedsClarification
                | ClaimState::ClassificationFailed
                | ClaimState::Reconciled
                | ClaimState::AdjudicationIndeterminate
                | ClaimState::Failed
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(&self, next: ClaimState) -> bool {
        use ClaimState::*;

        matches!(
            (*self, next),
            (Received, Classifying)
                | (Classifying, Routed | NeedsClarification | ClassificationFailed)
                | (NeedsClarification, Classifying)
                | (Routed, AssessingInitial)
                | (AssessingInitial, AssessingVerify | Reconciled | Failed)
                | (AssessingVerify, Reconciled | Adjudicating | Failed)
                | (Adjudicating, Reconciled | AdjudicationIndeterminate | Failed)
        )
    }
}

/// Rejected transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Illegal claim transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ClaimState,
    pub to: ClaimState,
}

/// History of the states one claim visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    history: Vec<ClaimState>,
}

impl Lifecycle {
    /// Start in `Received`.
    pub fn new() -> Self {
        Self {
            history: vec![ClaimState::Received],
        }
    }

    pub fn current(&self) -> ClaimState {
        // History always holds at least `Received`.
        self.history.last().copied().unwrap_or(ClaimState::Received)
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: ClaimState) -> Result<(), TransitionError> {
        let current = self.current();
        if !current.can_transition(next) {
            return Err(TransitionError {
                from: current,
                to: next,
            });
        }
        self.history.push(next);
        Ok(())
    }

    pub fn history(&self) -> &[ClaimState] {
        &self.history
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
