//! Adjudication between two diverging assessments.
//!
//! The service compares the records against the four fixed criteria and
//! answers in labeled prose. The reply is read with the tolerant label
//! search and resolved by `verity_core::reconcile`. A reply without a
//! winner is [`RuntimeError::AdjudicationIndeterminate`]; a winner is never
//! guessed.

use serde::Deserialize;

use verity_core::extract::read_adjudication;
use verity_core::reconcile;
use verity_core::{AdjudicationResult, AssessmentRecord, ClaimInput, RecordId};

use crate::client::ServiceClient;
use crate::config::CallPurpose;
use crate::error::RuntimeError;
use crate::prompts;

/// Caller-facing request for the dual-assessment flow.
#[derive(Debug, Clone, Deserialize)]
pub struct AdjudicationRequest {
    pub claim_text: String,
    pub assessment_a: String,
    pub assessment_b: String,
    pub score_a: f64,
    pub score_b: f64,
}

impl AdjudicationRequest {
    /// Validate into a claim and two records.
    pub fn into_parts(self) -> Result<(ClaimInput, AssessmentRecord, AssessmentRecord), RuntimeError> {
        let claim = ClaimInput::new(self.claim_text)?;
        Ok((
            claim,
            AssessmentRecord::new(self.score_a, self.assessment_a),
            AssessmentRecord::new(self.score_b, self.assessment_b),
        ))
    }
}

/// Compares two assessment records through the service.
pub struct Adjudicator {
    client: ServiceClient,
}

impl Adjudicator {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Judge which record is stronger and derive the final score.
    ///
    /// Both records must carry a rationale and finite scores; otherwise no
    /// service call is made. Scores are clamped into range first.
    pub async fn adjudicate(
        &self,
        claim: &ClaimInput,
        a: &AssessmentRecord,
        b: &AssessmentRecord,
    ) -> Result<AdjudicationResult, RuntimeError> {
        a.check(RecordId::A)?;
        b.check(RecordId::B)?;

        let a = a.clone().clamped();
        let b = b.clone().clamped();

        let raw = self
            .client
            .generate(
                CallPurpose::Adjudicate,
                prompts::adjudication_messages(claim, &a, &b),
            )
            .await?;

        if raw.trim().is_empty() {
            return Err(RuntimeError::Empty);
        }

        let reading = read_adjudication(&raw);
        if reading.raw_confidence.is_none() {
            tracing::debug!("Adjudication reply had no readable confidence, using the floor");
        }

        match reconcile::resolve(reading, &a, &b) {
            Some(result) => {
                tracing::debug!(
                    winner = %result.winner,
                    confidence = result.confidence,
                    final_score = result.final_score,
                    "Adjudication resolved"
                );
                Ok(result)
            }
            None => Err(RuntimeError::AdjudicationIndeterminate { raw }),
        }
    }

    /// Adjudicate a caller-facing request.
    pub async fn adjudicate_request(
        &self,
        request: AdjudicationRequest,
    ) -> Result<AdjudicationResult, RuntimeError> {
        let (claim, a, b) = request.into_parts()?;
        self.adjudicate(&claim, &a, &b).await
    }
}
