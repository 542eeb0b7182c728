//! Per-claim pipeline: classify, assess, reconcile.
//!
//! Each claim runs on its own fork of the service client, so the usage in
//! a report covers that claim only. A claim that needs clarification can
//! be re-submitted with [`Pipeline::resubmit`], which continues its
//! lifecycle. Claims share nothing else and may be
//! run concurrently from one [`Pipeline`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use verity_core::reconcile;
use verity_core::{
    AssessmentPass, ClaimInput, ClaimState, Lifecycle, ReconcileMethod, Routing, SignalPolicy,
    TrackDecision, Verdict,
};

use crate::adjudicator::Adjudicator;
use crate::assessor::{Assessor, StressTestReport};
use crate::classifier::Classifier;
use crate::client::ServiceClient;
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::providers::LlmProvider;
use crate::usage::LlmUsage;

/// Outcome of one claim that reached a terminal state without error.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub claim: ClaimInput,

    /// Classifier decision, possibly a clarification request
    pub decision: TrackDecision,

    /// Reconciled verdict; `None` when clarification is needed
    pub verdict: Option<Verdict>,

    /// Adversarial review, when one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress_test: Option<StressTestReport>,

    /// States visited
    pub lifecycle: Lifecycle,

    /// Service usage for this claim
    pub usage: LlmUsage,

    pub evaluated_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn state(&self) -> ClaimState {
        self.lifecycle.current()
    }

    pub fn needs_clarification(&self) -> bool {
        self.state() == ClaimState::NeedsClarification
    }
}

/// A claim that stopped in a failure state.
///
/// Carries the lifecycle and usage up to the failure so callers can see
/// where the claim stopped and what it cost.
#[derive(Error, Debug)]
#[error("Claim evaluation stopped in {:?}", .lifecycle.current())]
pub struct PipelineError {
    #[source]
    pub error: RuntimeError,
    pub lifecycle: Lifecycle,
    pub usage: LlmUsage,
}

impl PipelineError {
    pub fn state(&self) -> ClaimState {
        self.lifecycle.current()
    }
}

/// Runs claims through classification, assessment and reconciliation.
pub struct Pipeline {
    client: ServiceClient,
    policy: Arc<dyn SignalPolicy>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.client.config()
    }

    /// Evaluate raw caller text.
    ///
    /// Empty text fails with `InvalidInput` in `Received`, before any
    /// service call.
    pub async fn run(&self, text: &str) -> Result<PipelineReport, PipelineError> {
        self.run_with_context(text, None).await
    }

    pub async fn run_with_context(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<PipelineReport, PipelineError> {
        let claim = ClaimInput::new(text).map_err(|e| PipelineError {
            error: e.into(),
            lifecycle: Lifecycle::new(),
            usage: LlmUsage::default(),
        })?;
        let claim = match context {
            Some(context) => claim.with_context(context),
            None => claim,
        };
        self.run_claim(claim).await
    }

    /// Evaluate a validated claim.
    pub async fn run_claim(&self, claim: ClaimInput) -> Result<PipelineReport, PipelineError> {
        self.continue_claim(claim, Lifecycle::new(), LlmUsage::default())
            .await
    }

    /// Re-submit a claim that stopped in `NeedsClarification`.
    ///
    /// `text` replaces the claim text and the original context is kept. The
    /// report's lifecycle continues, so the history shows every round of
    /// classification, and usage accumulates across rounds. A report in
    /// any other state fails with a lifecycle error before any service call.
    pub async fn resubmit(
        &self,
        report: PipelineReport,
        text: &str,
    ) -> Result<PipelineReport, PipelineError> {
        let PipelineReport {
            claim,
            lifecycle,
            usage,
            ..
        } = report;

        let clarified = match ClaimInput::new(text) {
            Ok(clarified) => clarified,
            Err(e) => {
                return Err(PipelineError {
                    error: e.into(),
                    lifecycle,
                    usage,
                })
            }
        };
        let clarified = match claim.context() {
            Some(context) => clarified.with_context(context),
            None => clarified,
        };

        tracing::debug!(state = ?lifecycle.current(), "Claim re-submitted");
        self.continue_claim(clarified, lifecycle, usage).await
    }

    async fn continue_claim(
        &self,
        claim: ClaimInput,
        mut lifecycle: Lifecycle,
        mut usage: LlmUsage,
    ) -> Result<PipelineReport, PipelineError> {
        let client = self.client.fork();
        let outcome = self.evaluate(&client, &claim, &mut lifecycle).await;
        usage.merge(&client.usage());

        match outcome {
            Ok((decision, verdict)) => {
                match &verdict {
                    Some(verdict) => tracing::info!(
                        track = %verdict.track,
                        final_score = verdict.final_score,
                        method = ?verdict.method,
                        llm_calls = usage.llm_calls,
                        "Claim reconciled"
                    ),
                    None => tracing::info!(
                        questions = decision.clarifying_questions.len(),
                        "Claim needs clarification"
                    ),
                }
                Ok(PipelineReport {
                    claim,
                    decision,
                    verdict,
                    stress_test: None,
                    lifecycle,
                    usage,
                    evaluated_at: Utc::now(),
                })
            }
            Err(error) => {
                tracing::info!(
                    state = ?lifecycle.current(),
                    error = %error,
                    "Claim evaluation stopped"
                );
                Err(PipelineError {
                    error,
                    lifecycle,
                    usage,
                })
            }
        }
    }

    async fn evaluate(
        &self,
        client: &ServiceClient,
        claim: &ClaimInput,
        lifecycle: &mut Lifecycle,
    ) -> Result<(TrackDecision, Option<Verdict>), RuntimeError> {
        lifecycle.advance(ClaimState::Classifying)?;

        let classifier = Classifier::new(client.clone(), Arc::clone(&self.policy));
        let decision = on_error(
            classifier.classify(claim).await,
            lifecycle,
            ClaimState::ClassificationFailed,
        )?;

        let track = match decision.routing() {
            Routing::Routed(track) => track,
            Routing::NeedsClarification | Routing::Uncommitted => {
                lifecycle.advance(ClaimState::NeedsClarification)?;
                return Ok((decision, None));
            }
        };
        lifecycle.advance(ClaimState::Routed)?;
        lifecycle.advance(ClaimState::AssessingInitial)?;

        let assessor = Assessor::new(client.clone());

        let verdict = if track.requires_dual_assessment() {
            // Both passes are in flight together.
            lifecycle.advance(ClaimState::AssessingVerify)?;
            let (initial, verify) = on_error(
                assessor.assess_pair(claim, track).await,
                lifecycle,
                ClaimState::Failed,
            )?;

            let threshold = client.config().divergence_threshold;
            if reconcile::diverges(initial.reality_score, verify.reality_score, threshold) {
                lifecycle.advance(ClaimState::Adjudicating)?;
                let adjudicator = Adjudicator::new(client.clone());
                let result = adjudicator.adjudicate(claim, &initial, &verify).await;
                let failed_state = match &result {
                    Err(RuntimeError::AdjudicationIndeterminate { .. }) => {
                        ClaimState::AdjudicationIndeterminate
                    }
                    _ => ClaimState::Failed,
                };
                let adjudication = on_error(result, lifecycle, failed_state)?;

                Verdict {
                    track,
                    final_score: adjudication.final_score,
                    initial,
                    verify: Some(verify),
                    adjudication: Some(adjudication),
                    method: ReconcileMethod::Adjudicated,
                }
            } else {
                Verdict {
                    track,
                    final_score: reconcile::agreement_score(
                        initial.reality_score,
                        verify.reality_score,
                    ),
                    initial,
                    verify: Some(verify),
                    adjudication: None,
                    method: ReconcileMethod::Agreement,
                }
            }
        } else {
            let initial = on_error(
                assessor.assess(claim, track, AssessmentPass::Initial).await,
                lifecycle,
                ClaimState::Failed,
            )?;
            Verdict {
                track,
                final_score: initial.reality_score,
                initial,
                verify: None,
                adjudication: None,
                method: ReconcileMethod::SinglePass,
            }
        };

        lifecycle.advance(ClaimState::Reconciled)?;
        Ok((decision, Some(verdict)))
    }

    /// Attack the report's verdict and attach the review.
    ///
    /// A report without a verdict is left untouched and no call is made.
    /// The call's usage is added to the report's.
    pub async fn stress_test(&self, report: &mut PipelineReport) -> Result<(), RuntimeError> {
        let Some(verdict) = &report.verdict else {
            return Ok(());
        };

        let client = self.client.fork();
        let review = Assessor::new(client.clone())
            .stress_test(&report.claim, verdict)
            .await;
        report.usage.merge(&client.usage());

        let review = review?;
        tracing::info!(
            robustness = review.robustness,
            counterarguments = review.counterarguments.len(),
            "Verdict stress-tested"
        );
        report.stress_test = Some(review);
        Ok(())
    }
}

/// Record the failure state before handing the error back.
fn on_error<T>(
    result: Result<T, RuntimeError>,
    lifecycle: &mut Lifecycle,
    state: ClaimState,
) -> Result<T, RuntimeError> {
    if result.is_err() {
        lifecycle.advance(state)?;
    }
    result
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    policy: Option<Arc<dyn SignalPolicy>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
            policy: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the signal policy named in the configuration.
    pub fn policy(mut self, policy: Arc<dyn SignalPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<Pipeline, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::Config("No provider set".to_string()))?;
        self.config.validate()?;

        let policy = self
            .policy
            .unwrap_or_else(|| Arc::from(self.config.signal_policy.build()));

        Ok(Pipeline {
            client: ServiceClient::new(provider, self.config),
            policy,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::testing::{prompt_text, MockProvider};
    use verity_core::signals::ServiceSignals;
    use verity_core::{RecordId, Track};

    const VERIFICATION: &str =
        r#"{"track": "factual-verification", "confidence": 0.9, "explanation": "statistic"}"#;

    const UNEMPLOYMENT: &str = "Did unemployment rise last quarter?";

    const INITIAL_SEVEN: &str = r#"{"reality_score": 7, "integrity_score": 0.6, "rationale": "BLS household survey shows a 0.3 point rise."}"#;

    const VERIFY_TWO: &str =
        r#"{"reality_score": 2, "rationale": "Seasonally adjusted payroll data shows no rise."}"#;

    /// Answers by call kind, identified from the system prompt.
    fn scripted(
        classify: &'static str,
        initial: &'static str,
        verify: &'static str,
        adjudicate: &'static str,
    ) -> Arc<MockProvider> {
        Arc::new(MockProvider::new(move |messages| {
            let prompt = prompt_text(messages);
            let reply = if prompt.contains("## Task: classify") {
                classify
            } else if prompt.contains("## Task: adjudicate") {
                adjudicate
            } else if prompt.contains("PASS: verify") {
                verify
            } else {
                initial
            };
            Ok(reply.to_string())
        }))
    }

    fn pipeline(provider: Arc<MockProvider>) -> Pipeline {
        Pipeline::builder().provider(provider).build().unwrap()
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(
            Pipeline::builder().build(),
            Err(RuntimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_agreeing_passes_skip_adjudication() {
        let provider = scripted(
            VERIFICATION,
            r#"{"reality_score": 6, "rationale": "BLS"}"#,
            r#"{"reality_score": 5, "rationale": "BLS again"}"#,
            "WINNER: A",
        );
        let report = pipeline(provider.clone())
            .run("Did unemployment rise last quarter?")
            .await
            .unwrap();

        let verdict = report.verdict.unwrap();
        assert_eq!(verdict.method, ReconcileMethod::Agreement);
        assert_eq!(verdict.final_score, 5.5);
        assert_eq!(provider.calls(), 3);
        assert_eq!(report.usage.llm_calls, 3);
        assert_eq!(
            report.lifecycle.history(),
            &[
                ClaimState::Received,
                ClaimState::Classifying,
                ClaimState::Routed,
                ClaimState::AssessingInitial,
                ClaimState::AssessingVerify,
                ClaimState::Reconciled,
            ]
        );
    }

    #[tokio::test]
    async fn test_exploration_runs_single_pass() {
        let provider = scripted(
            r#"{"track": "normative-exploration", "confidence": 0.8}"#,
            r#"{"reality_score": 1, "rationale": "contested"}"#,
            r#"{"reality_score": 9, "rationale": "unused"}"#,
            "WINNER: A",
        );
        let report = pipeline(provider.clone())
            .run("Should the minimum wage be raised?")
            .await
            .unwrap();

        let verdict = report.verdict.unwrap();
        assert_eq!(verdict.track, Track::NormativeExploration);
        assert_eq!(verdict.method, ReconcileMethod::SinglePass);
        assert!(verdict.verify.is_none());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_clarification_stops_before_assessment() {
        let provider = scripted(
            r#"{"track": null, "confidence": 0.2, "clarifying_questions": ["Which policy?"]}"#,
            "",
            "",
            "",
        );
        let report = pipeline(provider.clone()).run("That policy?").await.unwrap();

        assert!(report.needs_clarification());
        assert!(report.verdict.is_none());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_assessment_failure_is_failed_state() {
        let provider = Arc::new(MockProvider::new(|messages| {
            if prompt_text(messages).contains("## Task: classify") {
                Ok(VERIFICATION.to_string())
            } else {
                Err(ProviderError::RateLimited { retry_after: None })
            }
        }));
        let err = pipeline(provider.clone())
            .run("Did unemployment rise last quarter?")
            .await
            .unwrap_err();

        assert_eq!(err.state(), ClaimState::Failed);
        assert!(err.error.is_retryable());
        assert_eq!(provider.calls(), 3);
        assert_eq!(err.usage.llm_calls, 1);
    }

    #[tokio::test]
    async fn test_reports_carry_own_usage() {
        let provider = scripted(
            r#"{"track": "normative-exploration", "confidence": 0.8}"#,
            r#"{"reality_score": 1, "rationale": "contested"}"#,
            "",
            "",
        );
        let pipeline = pipeline(provider);
        let (first, second) = tokio::join!(
            pipeline.run("Should the minimum wage be raised?"),
            pipeline.run("Is a four-day week fairer?"),
        );
        assert_eq!(first.unwrap().usage.llm_calls, 2);
        assert_eq!(second.unwrap().usage.llm_calls, 2);
    }

    #[tokio::test]
    async fn test_policy_override() {
        let provider = scripted(
            r#"{"track": "normative-exploration", "confidence": 0.8}"#,
            r#"{"reality_score": 1, "rationale": "contested"}"#,
            "",
            "",
        );
        let text = "Wake up, everyone knows the mainstream media lies about this.";

        let rules = pipeline(provider.clone()).run(text).await.unwrap();
        assert_eq!(rules.decision.track, Some(Track::NormativeExplorationDefensive));

        let service = Pipeline::builder()
            .provider(provider)
            .policy(Arc::new(ServiceSignals))
            .build()
            .unwrap();
        let report = service.run(text).await.unwrap();
        assert_eq!(report.decision.track, Some(Track::NormativeExploration));
    }

    #[tokio::test]
    async fn test_stress_test_attaches_review() {
        let provider = Arc::new(MockProvider::new(|messages| {
            let prompt = prompt_text(messages);
            let reply = if prompt.contains("## Task: classify") {
                r#"{"track": "normative-exploration", "confidence": 0.8}"#
            } else if prompt.contains("## Task: stress test") {
                "{\"counterarguments\": [\"Regional variation\"], \"robustness\": 0.6}\nHolds up."
            } else {
                r#"{"reality_score": 2, "rationale": "contested"}"#
            };
            Ok(reply.to_string())
        }));
        let pipeline = pipeline(provider);
        let mut report = pipeline
            .run("Should the minimum wage be raised?")
            .await
            .unwrap();
        pipeline.stress_test(&mut report).await.unwrap();

        let review = report.stress_test.unwrap();
        assert_eq!(review.robustness, 0.6);
        assert_eq!(review.narrative, "Holds up.");
        assert_eq!(report.usage.llm_calls, 3);
    }

    #[tokio::test]
    async fn test_diverging_passes_are_adjudicated() {
        let provider = scripted(
            VERIFICATION,
            INITIAL_SEVEN,
            VERIFY_TWO,
            "SOURCE_QUALITY: A\nREASONING_RIGOR: A\nEVIDENCE_COMPLETENESS: A\nCALIBRATION: B\n\nWINNER: A\nCONFIDENCE: 0.8\nRECOMMENDED_SCORE: none\nREASONING: A uses the primary series.",
        );
        let report = pipeline(provider.clone()).run(UNEMPLOYMENT).await.unwrap();

        let verdict = report.verdict.clone().unwrap();
        assert_eq!(verdict.method, ReconcileMethod::Adjudicated);
        assert_eq!(verdict.final_score, 6.0);

        let adjudication = verdict.adjudication.unwrap();
        assert_eq!(adjudication.winner, RecordId::A);
        assert_eq!(adjudication.confidence, 0.8);

        assert_eq!(provider.calls(), 4);
        assert_eq!(report.usage.llm_calls, 4);
        assert_eq!(report.usage.total_tokens, 4 * 150);
        assert!(report
            .lifecycle
            .history()
            .contains(&ClaimState::Adjudicating));
    }

    #[tokio::test]
    async fn test_adjudication_without_winner_is_indeterminate() {
        let provider = scripted(
            VERIFICATION,
            INITIAL_SEVEN,
            VERIFY_TWO,
            "Both assessments raise fair points.\nCONFIDENCE: 0.7",
        );
        let err = pipeline(provider).run(UNEMPLOYMENT).await.unwrap_err();

        assert_eq!(err.state(), ClaimState::AdjudicationIndeterminate);
        assert!(matches!(
            err.error,
            RuntimeError::AdjudicationIndeterminate { .. }
        ));
        assert!(!err.error.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_claim_rejected_without_calls() {
        let provider = scripted(VERIFICATION, "", "", "");

        for text in ["", "   \n\t"] {
            let err = pipeline(provider.clone()).run(text).await.unwrap_err();
            assert!(matches!(err.error, RuntimeError::InvalidInput(_)));
            assert_eq!(err.state(), ClaimState::Received);
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unusable_classification_is_not_defaulted() {
        let provider = scripted(
            "This looks like a factual question to me.",
            INITIAL_SEVEN,
            VERIFY_TWO,
            "",
        );
        let err = pipeline(provider.clone()).run(UNEMPLOYMENT).await.unwrap_err();

        assert_eq!(err.state(), ClaimState::ClassificationFailed);
        assert!(err.error.needs_reprompt());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_assessment_fails_claim() {
        let malformed = r#"{"reality_score": "high", "rationale": "BLS"}"#;
        let provider = scripted(VERIFICATION, INITIAL_SEVEN, malformed, "");
        let err = pipeline(provider).run(UNEMPLOYMENT).await.unwrap_err();

        assert_eq!(err.state(), ClaimState::Failed);
        assert_eq!(err.error.raw_reply(), Some(malformed));
    }

    #[tokio::test]
    async fn test_mirrored_claim_escalated_by_rules() {
        let provider = scripted(
            r#"{"track": "normative-exploration", "confidence": 0.75}"#,
            r#"{"reality_score": 8, "rationale": "Satellite imagery and geodesy."}"#,
            "",
            "",
        );
        let report = pipeline(provider)
            .run("The scientific consensus is settled, so how can anyone still believe these flat-earthers?")
            .await
            .unwrap();

        assert_eq!(report.decision.track, Some(Track::NormativeExplorationMirrored));
        assert_eq!(
            report.verdict.map(|v| v.method),
            Some(ReconcileMethod::SinglePass)
        );
    }

    /// Asks for clarification on the vague wording and routes anything else.
    fn clarifying() -> Arc<MockProvider> {
        Arc::new(MockProvider::new(|messages| {
            let prompt = prompt_text(messages);
            let reply = if !prompt.contains("## Task: classify") {
                r#"{"reality_score": 1, "rationale": "contested"}"#
            } else if prompt.contains("That policy?") {
                r#"{"track": null, "confidence": 0.2, "clarifying_questions": ["Which policy?"]}"#
            } else {
                r#"{"track": "normative-exploration", "confidence": 0.8}"#
            };
            Ok(reply.to_string())
        }))
    }

    #[tokio::test]
    async fn test_resubmit_continues_lifecycle() {
        let provider = clarifying();
        let pipeline = pipeline(provider.clone());

        let asked = pipeline
            .run_with_context("That policy?", Some("Debate about wages"))
            .await
            .unwrap();
        assert!(asked.needs_clarification());

        let report = pipeline
            .resubmit(asked, "Should the minimum wage be raised?")
            .await
            .unwrap();

        assert_eq!(report.state(), ClaimState::Reconciled);
        assert_eq!(report.claim.text(), "Should the minimum wage be raised?");
        assert_eq!(report.claim.context(), Some("Debate about wages"));
        assert_eq!(
            report.lifecycle.history(),
            &[
                ClaimState::Received,
                ClaimState::Classifying,
                ClaimState::NeedsClarification,
                ClaimState::Classifying,
                ClaimState::Routed,
                ClaimState::AssessingInitial,
                ClaimState::Reconciled,
            ]
        );
        assert_eq!(provider.calls(), 3);
        assert_eq!(report.usage.llm_calls, 3);
    }

    #[tokio::test]
    async fn test_resubmit_requires_clarification_state() {
        let provider = clarifying();
        let pipeline = pipeline(provider.clone());
        let reconciled = pipeline
            .run("Should the minimum wage be raised?")
            .await
            .unwrap();

        let err = pipeline
            .resubmit(reconciled, "Is a four-day week fairer?")
            .await
            .unwrap_err();

        assert!(matches!(err.error, RuntimeError::Lifecycle(_)));
        assert_eq!(err.state(), ClaimState::Reconciled);
        assert_eq!(err.usage.llm_calls, 2);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_resubmit_rejects_blank_text() {
        let provider = clarifying();
        let pipeline = pipeline(provider.clone());
        let asked = pipeline.run("That policy?").await.unwrap();

        let err = pipeline.resubmit(asked, "  ").await.unwrap_err();

        assert!(matches!(err.error, RuntimeError::InvalidInput(_)));
        assert_eq!(err.state(), ClaimState::NeedsClarification);
        assert_eq!(provider.calls(), 1);
    }
}
