//! JSON Schemas for structured service replies.
//!
//! The built-in schemas live in `schemas/` at the workspace root and are
//! embedded at compile time. Each is compiled once and reused.

use std::sync::OnceLock;
use thiserror::Error;

const CLASSIFICATION_SCHEMA_JSON: &str =
    include_str!("../../../../schemas/classification.schema.json");
const ASSESSMENT_SCHEMA_JSON: &str = include_str!("../../../../schemas/assessment.schema.json");
const STRESS_TEST_SCHEMA_JSON: &str = include_str!("../../../../schemas/stress_test.schema.json");

static CLASSIFICATION: OnceLock<Result<SchemaSpec, String>> = OnceLock::new();
static ASSESSMENT: OnceLock<Result<SchemaSpec, String>> = OnceLock::new();
static STRESS_TEST: OnceLock<Result<SchemaSpec, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("Failed to load schema '{name}': {message}")]
    LoadError { name: String, message: String },
}

/// The schemas shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinSchema {
    Classification,
    Assessment,
    StressTest,
}

impl BuiltinSchema {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinSchema::Classification => "classification",
            BuiltinSchema::Assessment => "assessment",
            BuiltinSchema::StressTest => "stress_test",
        }
    }

    /// Get the compiled schema, compiling it on first use.
    pub fn spec(&self) -> Result<&'static SchemaSpec, SchemaError> {
        let (cell, source) = match self {
            BuiltinSchema::Classification => (&CLASSIFICATION, CLASSIFICATION_SCHEMA_JSON),
            BuiltinSchema::Assessment => (&ASSESSMENT, ASSESSMENT_SCHEMA_JSON),
            BuiltinSchema::StressTest => (&STRESS_TEST, STRESS_TEST_SCHEMA_JSON),
        };

        let name = self.name();
        let result = cell.get_or_init(|| {
            let schema: serde_json::Value = serde_json::from_str(source)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;
            SchemaSpec::new(name, &schema).map_err(|e| e.to_string())
        });

        result.as_ref().map_err(|message| SchemaError::LoadError {
            name: name.to_string(),
            message: message.clone(),
        })
    }
}

/// A compiled schema that a structured payload must satisfy.
pub struct SchemaSpec {
    name: String,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for SchemaSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaSpec").field("name", &self.name).finish()
    }
}

impl SchemaSpec {
    /// Compile a schema from its JSON form.
    pub fn new(name: impl Into<String>, schema: &serde_json::Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = jsonschema::options()
            .build(schema)
            .map_err(|e| SchemaError::LoadError {
                name: name.clone(),
                message: format!("Failed to compile schema: {}", e),
            })?;

        Ok(Self { name, validator })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validate a payload, collecting every violation.
    pub fn validate(&self, payload: &serde_json::Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(payload)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_schemas_compile() {
        for schema in [
            BuiltinSchema::Classification,
            BuiltinSchema::Assessment,
            BuiltinSchema::StressTest,
        ] {
            let spec = schema.spec().unwrap();
            assert_eq!(spec.name(), schema.name());
        }
    }

    #[test]
    fn test_assessment_requires_score() {
        let spec = BuiltinSchema::Assessment.spec().unwrap();
        assert!(spec
            .validate(&json!({"reality_score": 4.5, "rationale": "ok"}))
            .is_ok());

        let errors = spec.validate(&json!({"rationale": "no score"})).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_classification_rejects_unknown_track() {
        let spec = BuiltinSchema::Classification.spec().unwrap();
        assert!(spec
            .validate(&json!({"track": "vibes", "confidence": 0.9}))
            .is_err());
        assert!(spec
            .validate(&json!({"track": null, "confidence": 0.2, "clarifying_questions": ["Which?"]}))
            .is_ok());
    }

    #[test]
    fn test_custom_schema() {
        let spec = SchemaSpec::new("custom", &json!({"type": "array"})).unwrap();
        assert!(spec.validate(&json!([1, 2])).is_ok());
        assert!(spec.validate(&json!({})).is_err());
    }
}
