//! Bounded-time calls to the text-generation service.

use std::sync::Arc;

use crate::config::{CallPurpose, RuntimeConfig};
use crate::providers::{ChatMessage, LlmProvider, ProviderError};
use crate::usage::{LlmUsage, UsageTracker};

/// Provider handle shared by the classifier, assessor and adjudicator.
///
/// Cloning is cheap and clones share the usage tally.
#[derive(Clone)]
pub struct ServiceClient {
    provider: Arc<dyn LlmProvider>,
    config: Arc<RuntimeConfig>,
    usage: Arc<UsageTracker>,
}

impl ServiceClient {
    pub fn new(provider: Arc<dyn LlmProvider>, config: RuntimeConfig) -> Self {
        Self {
            provider,
            config: Arc::new(config),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    /// Send one request and return the raw reply text.
    ///
    /// The call is bounded by the configured timeout. Failures are returned,
    /// never retried.
    pub async fn generate(
        &self,
        purpose: CallPurpose,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ProviderError> {
        let completion = self.config.completion(purpose);

        tracing::debug!(
            purpose = %purpose,
            provider = self.provider.name(),
            model = %completion.model,
            max_tokens = completion.max_tokens,
            capabilities = ?completion.capabilities,
            "Calling text-generation service"
        );

        let call = self.provider.complete(messages, &completion);
        let response = match tokio::time::timeout(completion.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(ProviderError::Timeout(completion.timeout)),
        };

        self.usage.record(purpose, &response.usage, &response.model);

        tracing::debug!(
            purpose = %purpose,
            tokens = response.usage.total(),
            stop_reason = ?response.stop_reason,
            reply_len = response.content.len(),
            "Service replied"
        );

        Ok(response.content)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Usage so far across every clone of this client.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    /// Client on the same provider and configuration with its own tally.
    pub fn fork(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            config: Arc::clone(&self.config),
            usage: Arc::new(UsageTracker::new()),
        }
    }
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("provider", &self.provider.name())
            .field("model", &self.config.model)
            .finish()
    }
}
