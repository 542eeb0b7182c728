//! Scripted provider for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync>;

/// Answers every request through a closure and records what it was sent.
pub(crate) struct MockProvider {
    respond: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<ChatMessage>, CompletionConfig)>>,
}

impl MockProvider {
    pub fn new(
        respond: impl Fn(&[ChatMessage]) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Vec<ChatMessage>, CompletionConfig)> {
        self.requests.lock().clone()
    }
}

/// Concatenated content of every message, for prompt assertions.
pub(crate) fn prompt_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push((messages.clone(), config.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = (self.respond)(&messages)?;
        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                ..Default::default()
            },
            model: "mock".to_string(),
            stop_reason: Some("end_turn".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "mock"
    }
}
