//! Service-backed claim classifier.
//!
//! One service call per claim, carrying the routing policy. The reply goes
//! through the classification schema, then the configured
//! [`SignalPolicy`] may refine it. A reply that cannot be used is a
//! [`RuntimeError::ClassificationFailed`]; no track is ever defaulted.

use serde::Deserialize;
use std::sync::Arc;

use verity_core::extract::{extract_typed, BuiltinSchema};
use verity_core::scores::{self, CLARIFICATION_CONFIDENCE};
use verity_core::{ClaimInput, MixedComponents, Routing, SignalPolicy, Track, TrackDecision};

use crate::client::ServiceClient;
use crate::config::CallPurpose;
use crate::error::{extracted, RuntimeError};
use crate::prompts;

/// Classification reply as the schema admits it.
#[derive(Debug, Deserialize)]
struct ClassificationReply {
    #[serde(default)]
    track: Option<Track>,
    confidence: f64,
    #[serde(default)]
    signals: Vec<String>,
    #[serde(default)]
    clarifying_questions: Vec<String>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    components: Option<MixedComponents>,
}

impl ClassificationReply {
    /// Build the decision, or `None` when the reply commits to nothing.
    ///
    /// Questions make the decision provisional only when the reply also
    /// withholds a track or is below [`CLARIFICATION_CONFIDENCE`]. A
    /// confident routed reply has its stray questions dropped.
    fn into_decision(self) -> Option<TrackDecision> {
        let confidence = scores::clamp_unit(self.confidence);
        let questions: Vec<String> = self
            .clarifying_questions
            .into_iter()
            .filter(|q| !q.trim().is_empty())
            .collect();

        let provisional = !questions.is_empty()
            && (self.track.is_none() || confidence < CLARIFICATION_CONFIDENCE);

        let mut decision = if provisional {
            TrackDecision::clarify(confidence, questions, self.explanation)
        } else {
            let track = self.track?;
            if !questions.is_empty() {
                tracing::debug!(
                    track = %track,
                    confidence,
                    "Dropping clarifying questions from a confident routed reply"
                );
            }
            let mut decision = TrackDecision::routed(track, confidence, self.explanation);
            decision.components = self.components;
            decision
        };

        for signal in self.signals {
            decision.push_signal(signal);
        }
        Some(decision)
    }
}

/// Routes claims to tracks through the text-generation service.
pub struct Classifier {
    client: ServiceClient,
    policy: Arc<dyn SignalPolicy>,
}

impl Classifier {
    pub fn new(client: ServiceClient, policy: Arc<dyn SignalPolicy>) -> Self {
        Self { client, policy }
    }

    /// Classifier using the policy named in the client's configuration.
    pub fn from_config(client: ServiceClient) -> Self {
        let policy = Arc::from(client.config().signal_policy.build());
        Self::new(client, policy)
    }

    /// Validate raw caller text, then classify it.
    ///
    /// Empty or whitespace-only text fails with `InvalidInput` before any
    /// service call.
    pub async fn classify_text(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<TrackDecision, RuntimeError> {
        let mut claim = ClaimInput::new(text)?;
        if let Some(context) = context {
            claim = claim.with_context(context);
        }
        self.classify(&claim).await
    }

    pub async fn classify(&self, claim: &ClaimInput) -> Result<TrackDecision, RuntimeError> {
        let schema = BuiltinSchema::Classification.spec()?;

        let raw = self
            .client
            .generate(CallPurpose::Classify, prompts::classification_messages(claim))
            .await
            .map_err(|e| RuntimeError::classification(e.into()))?;

        let reply: ClassificationReply =
            extracted(extract_typed(&raw, schema)).map_err(RuntimeError::classification)?;

        let decision = reply.into_decision().ok_or_else(|| {
            RuntimeError::classification(RuntimeError::Malformed {
                raw: raw.clone(),
                error: "reply named no track and asked no clarifying questions".to_string(),
            })
        })?;

        let decision = self.policy.refine(claim, decision);

        match decision.routing() {
            Routing::Routed(track) => tracing::debug!(
                track = %track,
                confidence = decision.confidence,
                policy = self.policy.name(),
                "Claim classified"
            ),
            Routing::NeedsClarification => tracing::debug!(
                questions = decision.clarifying_questions.len(),
                "Classifier asked for clarification"
            ),
            Routing::Uncommitted => {
                return Err(RuntimeError::classification(RuntimeError::Malformed {
                    raw,
                    error: "decision lost its track during refinement".to_string(),
                }))
            }
        }

        Ok(decision)
    }
}
