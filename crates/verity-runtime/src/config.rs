//! Runtime configuration.
//!
//! Loaded from YAML; every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```yaml
//! model: claude-sonnet-4-5-20250929
//! timeout: 45s
//! budgets:
//!   assess: 2000
//! web_search: true
//! divergence_threshold: 1.5
//! signal_policy: rules
//! stress_test: false
//! provider:
//!   type: anthropic
//!   settings:
//!     base_url: https://api.anthropic.com/v1
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use verity_core::scores::DEFAULT_DIVERGENCE_THRESHOLD;
use verity_core::SignalPolicyKind;

use crate::error::RuntimeError;
use crate::providers::{Capability, CompletionConfig, LlmProvider, ProviderRegistry};

/// Why a service call is made. Each purpose has its own token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    Classify,
    Assess,
    Adjudicate,
    StressTest,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::Classify => "classify",
            CallPurpose::Assess => "assess",
            CallPurpose::Adjudicate => "adjudicate",
            CallPurpose::StressTest => "stress_test",
        }
    }

    /// Whether the call gathers evidence and so may search the web.
    fn gathers_evidence(&self) -> bool {
        matches!(self, CallPurpose::Assess | CallPurpose::StressTest)
    }
}

impl fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply token budgets per call purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenBudgets {
    pub classify: u32,
    pub assess: u32,
    pub adjudicate: u32,
    pub stress_test: u32,
}

impl Default for TokenBudgets {
    fn default() -> Self {
        Self {
            classify: 600,
            assess: 1500,
            adjudicate: 800,
            stress_test: 1200,
        }
    }
}

impl TokenBudgets {
    pub fn get(&self, purpose: CallPurpose) -> u32 {
        match purpose {
            CallPurpose::Classify => self.classify,
            CallPurpose::Assess => self.assess,
            CallPurpose::Adjudicate => self.adjudicate,
            CallPurpose::StressTest => self.stress_test,
        }
    }
}

/// Which provider to build and its JSON settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(rename = "type")]
    pub kind: String,

    /// Provider-specific settings, handed to the factory as JSON
    pub settings: JsonValue,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: "anthropic".to_string(),
            settings: JsonValue::Object(Default::default()),
        }
    }
}

impl ProviderSettings {
    /// Create the provider through `registry`.
    pub fn build(&self, registry: &ProviderRegistry) -> Result<Arc<dyn LlmProvider>, RuntimeError> {
        Ok(registry.create(&self.kind, &self.settings)?)
    }
}

/// Configuration for the service-backed pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Model for every call
    pub model: String,

    /// Bound on each service call
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Sampling temperature
    pub temperature: f32,

    pub budgets: TokenBudgets,

    /// Offer web search to assessment and stress-test calls
    pub web_search: bool,

    /// Reality-score gap above which two passes are adjudicated
    pub divergence_threshold: f64,

    /// Where contempt and weaponization signals are evaluated
    pub signal_policy: SignalPolicyKind,

    /// Run the stress-test pass after reconciliation
    pub stress_test: bool,

    /// Cache the stable system prompts
    pub prompt_caching: bool,

    pub provider: ProviderSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            timeout: Duration::from_secs(30),
            temperature: 0.0,
            budgets: TokenBudgets::default(),
            web_search: true,
            divergence_threshold: DEFAULT_DIVERGENCE_THRESHOLD,
            signal_policy: SignalPolicyKind::default(),
            stress_test: false,
            prompt_caching: true,
            provider: ProviderSettings::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| RuntimeError::Config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.model.trim().is_empty() {
            return Err(RuntimeError::Config("model must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(RuntimeError::Config("timeout must be positive".to_string()));
        }
        if !self.divergence_threshold.is_finite() || self.divergence_threshold < 0.0 {
            return Err(RuntimeError::Config(format!(
                "divergence_threshold must be a non-negative number, got {}",
                self.divergence_threshold
            )));
        }
        for purpose in [
            CallPurpose::Classify,
            CallPurpose::Assess,
            CallPurpose::Adjudicate,
            CallPurpose::StressTest,
        ] {
            if self.budgets.get(purpose) == 0 {
                return Err(RuntimeError::Config(format!(
                    "budgets.{} must be positive",
                    purpose
                )));
            }
        }
        Ok(())
    }

    /// Completion settings for one call.
    pub fn completion(&self, purpose: CallPurpose) -> CompletionConfig {
        let capabilities = if self.web_search && purpose.gathers_evidence() {
            vec![Capability::WebSearch]
        } else {
            Vec::new()
        };

        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.budgets.get(purpose),
            temperature: self.temperature,
            timeout: self.timeout,
            capabilities,
            prompt_caching: self.prompt_caching,
        }
    }
}

/// Durations written as "30s", "1m 30s".
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_yaml("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.divergence_threshold, 2.0);
        assert_eq!(config.signal_policy, SignalPolicyKind::Rules);
    }

    #[test]
    fn test_partial_overrides() {
        let config = RuntimeConfig::from_yaml(
            "timeout: 1m 30s\nbudgets:\n  assess: 2000\nsignal_policy: service\nprovider:\n  type: anthropic\n  settings:\n    base_url: https://proxy.local/v1\n",
        )
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.budgets.assess, 2000);
        assert_eq!(config.budgets.classify, 600);
        assert_eq!(config.signal_policy, SignalPolicyKind::Service);
        assert_eq!(config.provider.settings["base_url"], "https://proxy.local/v1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("timeout: soon"),
            Err(RuntimeError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("divergence_threshold: -1"),
            Err(RuntimeError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("budgets:\n  classify: 0"),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_web_search_only_for_evidence_calls() {
        let config = RuntimeConfig::default();
        assert!(config
            .completion(CallPurpose::Assess)
            .has_capability(Capability::WebSearch));
        assert!(!config
            .completion(CallPurpose::Classify)
            .has_capability(Capability::WebSearch));
        assert!(!config
            .completion(CallPurpose::Adjudicate)
            .has_capability(Capability::WebSearch));

        let config = RuntimeConfig {
            web_search: false,
            ..Default::default()
        };
        assert!(config.completion(CallPurpose::Assess).capabilities.is_empty());
    }

    #[test]
    fn test_budget_per_purpose() {
        let config = RuntimeConfig::default();
        assert_eq!(config.completion(CallPurpose::Classify).max_tokens, 600);
        assert_eq!(config.completion(CallPurpose::StressTest).max_tokens, 1200);
    }

    #[test]
    fn test_yaml_round_trip_keeps_timeout_readable() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default()).unwrap();
        assert!(yaml.contains("timeout: 30s"));
    }
}
