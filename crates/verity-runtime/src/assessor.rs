//! Assessment passes.
//!
//! Verification claims get two independent passes, initial and verify,
//! issued concurrently. Exploration claims get one. The optional stress
//! test attacks a reconciled verdict.

use futures::future;
use serde::{Deserialize, Serialize};

use verity_core::extract::{extract_typed, extract_typed_with_residual, BuiltinSchema};
use verity_core::{scores, AssessmentPass, AssessmentRecord, ClaimInput, Extracted, Track, Verdict};

use crate::client::ServiceClient;
use crate::config::CallPurpose;
use crate::error::{extracted, RuntimeError};
use crate::prompts;

/// Skeptic's review of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestReport {
    /// Strongest arguments against the verdict
    pub counterarguments: Vec<String>,

    /// How well the verdict holds up, in [0, 1]
    pub robustness: f64,

    /// Weakest link in the verdict's evidence
    pub weakest_point: Option<String>,

    /// Narrative that followed the structured block
    pub narrative: String,
}

#[derive(Debug, Deserialize)]
struct StressTestReply {
    counterarguments: Vec<String>,
    robustness: f64,
    #[serde(default)]
    weakest_point: Option<String>,
}

/// Runs assessment and stress-test passes.
pub struct Assessor {
    client: ServiceClient,
}

impl Assessor {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// Run one assessment pass.
    ///
    /// Scores outside their range are clamped. A record with a blank
    /// rationale is malformed: there would be nothing to adjudicate.
    pub async fn assess(
        &self,
        claim: &ClaimInput,
        track: Track,
        pass: AssessmentPass,
    ) -> Result<AssessmentRecord, RuntimeError> {
        let schema = BuiltinSchema::Assessment.spec()?;

        let raw = self
            .client
            .generate(
                CallPurpose::Assess,
                prompts::assessment_messages(claim, track, pass),
            )
            .await?;

        let record: AssessmentRecord = extracted(extract_typed(&raw, schema))?;
        if record.is_empty() {
            return Err(RuntimeError::Malformed {
                raw,
                error: "assessment rationale is empty".to_string(),
            });
        }

        let record = record.clamped();
        tracing::debug!(
            track = %track,
            pass = pass.as_str(),
            reality_score = record.reality_score,
            "Assessment pass complete"
        );
        Ok(record)
    }

    /// Run the initial and verify passes concurrently.
    ///
    /// Both calls are always awaited. If both fail, the initial pass's
    /// error is returned.
    pub async fn assess_pair(
        &self,
        claim: &ClaimInput,
        track: Track,
    ) -> Result<(AssessmentRecord, AssessmentRecord), RuntimeError> {
        let (initial, verify) = future::join(
            self.assess(claim, track, AssessmentPass::Initial),
            self.assess(claim, track, AssessmentPass::Verify),
        )
        .await;

        Ok((initial?, verify?))
    }

    /// Ask the service to attack a reconciled verdict.
    pub async fn stress_test(
        &self,
        claim: &ClaimInput,
        verdict: &Verdict,
    ) -> Result<StressTestReport, RuntimeError> {
        let schema = BuiltinSchema::StressTest.spec()?;

        let raw = self
            .client
            .generate(
                CallPurpose::StressTest,
                prompts::stress_test_messages(claim, verdict),
            )
            .await?;

        let Extracted { payload, residual } =
            extracted(extract_typed_with_residual::<StressTestReply>(&raw, schema))?;

        Ok(StressTestReport {
            counterarguments: payload.counterarguments,
            robustness: scores::clamp_field("robustness", payload.robustness, 0.0, 1.0),
            weakest_point: payload.weakest_point.filter(|p| !p.trim().is_empty()),
            narrative: residual,
        })
    }
}
