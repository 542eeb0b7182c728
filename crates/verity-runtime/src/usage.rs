//! Token and cost accounting for service calls.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CallPurpose;
use crate::providers::TokenUsage;

/// Price per web search in USD.
const WEB_SEARCH_COST: f64 = 0.01;

/// Accumulated usage across service calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Number of service calls that returned
    pub llm_calls: u32,

    /// Calls broken down by purpose
    pub calls_by_purpose: BTreeMap<CallPurpose, u32>,

    pub total_tokens: u32,

    pub prompt_tokens: u32,

    pub completion_tokens: u32,

    /// Tokens written to cache
    pub cache_creation_tokens: u32,

    /// Tokens read from cache
    pub cache_read_tokens: u32,

    pub web_searches: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Add one call's usage.
    pub fn add(&mut self, purpose: CallPurpose, usage: &TokenUsage, model: &str) {
        self.llm_calls += 1;
        *self.calls_by_purpose.entry(purpose).or_insert(0) += 1;
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.cache_creation_tokens += usage.cache_creation_tokens;
        self.cache_read_tokens += usage.cache_read_tokens;
        self.web_searches += usage.web_searches;
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: &LlmUsage) {
        self.llm_calls += other.llm_calls;
        for (purpose, calls) in &other.calls_by_purpose {
            *self.calls_by_purpose.entry(*purpose).or_insert(0) += calls;
        }
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.web_searches += other.web_searches;
        self.estimated_cost += other.estimated_cost;
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens: input, output, cache write, cache read
        let (input_rate, output_rate, cache_write_rate, cache_read_rate) = match model {
            m if m.contains("opus-4") => (15.0, 75.0, 18.75, 1.5),
            m if m.contains("haiku-4-5") => (1.0, 5.0, 1.25, 0.1),
            m if m.contains("haiku") => (0.8, 4.0, 1.0, 0.08),
            _ => (3.0, 15.0, 3.75, 0.3),
        };

        let per_million = |tokens: u32, rate: f64| tokens as f64 / 1_000_000.0 * rate;

        per_million(usage.prompt_tokens, input_rate)
            + per_million(usage.completion_tokens, output_rate)
            + per_million(usage.cache_creation_tokens, cache_write_rate)
            + per_million(usage.cache_read_tokens, cache_read_rate)
            + usage.web_searches as f64 * WEB_SEARCH_COST
    }
}

/// Thread-safe usage tally shared by the components of one pipeline.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, purpose: CallPurpose, usage: &TokenUsage, model: &str) {
        self.usage.write().add(purpose, usage, model);
    }

    /// Copy of the current tally.
    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(prompt: u32, completion: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            ..Default::default()
        }
    }

    #[test]
    fn test_tracker_counts_by_purpose() {
        let tracker = UsageTracker::new();
        tracker.record(CallPurpose::Classify, &tokens(30, 20), "claude-sonnet-4-5");
        tracker.record(CallPurpose::Assess, &tokens(100, 50), "claude-sonnet-4-5");
        tracker.record(CallPurpose::Assess, &tokens(100, 50), "claude-sonnet-4-5");

        let usage = tracker.snapshot();
        assert_eq!(usage.llm_calls, 3);
        assert_eq!(usage.total_tokens, 350);
        assert_eq!(usage.calls_by_purpose[&CallPurpose::Assess], 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let tracker = UsageTracker::new();
        tracker.record(CallPurpose::Adjudicate, &tokens(10, 10), "m");
        let before = tracker.snapshot();
        tracker.record(CallPurpose::Adjudicate, &tokens(10, 10), "m");
        assert_eq!(before.llm_calls, 1);
        assert_eq!(tracker.snapshot().llm_calls, 2);
    }

    #[test]
    fn test_cost_estimation() {
        let mut usage = LlmUsage::default();
        usage.add(CallPurpose::Assess, &tokens(1000, 500), "claude-sonnet-4-5");
        // 1000 * $3/MTok + 500 * $15/MTok
        assert!((usage.estimated_cost - 0.0105).abs() < 1e-9);

        let mut searched = LlmUsage::default();
        let with_search = TokenUsage {
            web_searches: 2,
            ..tokens(1000, 500)
        };
        searched.add(CallPurpose::Assess, &with_search, "claude-sonnet-4-5");
        assert!((searched.estimated_cost - 0.0305).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = LlmUsage::default();
        a.add(CallPurpose::Classify, &tokens(10, 5), "m");
        let mut b = LlmUsage::default();
        b.add(CallPurpose::Classify, &tokens(20, 5), "m");
        a.merge(&b);
        assert_eq!(a.llm_calls, 2);
        assert_eq!(a.prompt_tokens, 30);
        assert_eq!(a.calls_by_purpose[&CallPurpose::Classify], 2);
    }
}
