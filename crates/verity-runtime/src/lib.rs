//! # verity-runtime
//!
//! Service-backed claim evaluation for Verity.
//!
//! Every call to the text-generation service lives here:
//!
//! - [`Classifier`]: routes a claim to one of the four tracks
//! - [`Assessor`]: initial, verify and stress-test passes
//! - [`Adjudicator`]: picks the stronger of two diverging assessments
//! - [`Pipeline`]: runs one claim end to end through its lifecycle
//!
//! Calls are bounded by a timeout and never retried here. Failures come
//! back as [`RuntimeError`]; the caller decides whether to retry
//! ([`RuntimeError::is_retryable`]) or re-prompt
//! ([`RuntimeError::needs_reprompt`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use verity_runtime::{Pipeline, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_file("verity.yaml")?;
//! let provider = config.provider.build(&ProviderRegistry::with_defaults())?;
//! let pipeline = Pipeline::builder()
//!     .provider(provider)
//!     .config(config)
//!     .build()?;
//!
//! let report = pipeline.run("Did unemployment rise last quarter?").await?;
//! println!("{:?}", report.verdict.map(|v| v.final_score));
//! ```

pub mod adjudicator;
pub mod assessor;
pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod usage;

#[cfg(test)]
mod testing;

pub use adjudicator::{AdjudicationRequest, Adjudicator};
pub use assessor::{Assessor, StressTestReport};
pub use classifier::Classifier;
pub use client::ServiceClient;
pub use config::{CallPurpose, ProviderSettings, RuntimeConfig, TokenBudgets};
pub use error::RuntimeError;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError, PipelineReport};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, TokenUsage,
};
pub use usage::{LlmUsage, UsageTracker};

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, AnthropicProviderFactory};
