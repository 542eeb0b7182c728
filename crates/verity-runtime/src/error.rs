//! Runtime error taxonomy.
//!
//! Every failure reaches the caller as one of these variants. Nothing is
//! logged and dropped inside the runtime.

use thiserror::Error;
use verity_core::extract::SchemaError;
use verity_core::{ExtractionOutcome, InputError, TransitionError};

use crate::providers::ProviderError;

/// Errors from classification, assessment and adjudication.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Caller error; not retryable.
    #[error("Invalid input: {0}")]
    InvalidInput(InputError),

    /// A precondition on the inputs did not hold.
    #[error("Insufficient input: {0}")]
    InsufficientInput(InputError),

    /// The service could not be reached or returned an error status.
    #[error("Transport failure: {0}")]
    Transport(#[from] ProviderError),

    /// The service replied, but the reply held no usable payload.
    #[error("Malformed service reply: {error}")]
    Malformed { raw: String, error: String },

    /// The service replied with nothing.
    #[error("Empty service reply")]
    Empty,

    /// Classification reached no commitment. The cause is kept so callers
    /// can tell transport trouble from an unusable reply.
    #[error("Classification failed: {0}")]
    ClassificationFailed(Box<RuntimeError>),

    /// The adjudication reply named no winner.
    #[error("Adjudication indeterminate: reply named no winner")]
    AdjudicationIndeterminate { raw: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Lifecycle(#[from] TransitionError),
}

impl RuntimeError {
    /// Wrap as a classification failure.
    pub fn classification(cause: RuntimeError) -> Self {
        match cause {
            // Caller errors stay caller errors.
            RuntimeError::InvalidInput(_) => cause,
            RuntimeError::ClassificationFailed(_) => cause,
            other => RuntimeError::ClassificationFailed(Box::new(other)),
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RuntimeError::Transport(e) => e.is_retryable(),
            RuntimeError::ClassificationFailed(cause) => cause.is_retryable(),
            _ => false,
        }
    }

    /// Whether the service answered unusably, so a caller may re-prompt with
    /// a repair instruction rather than retry verbatim.
    pub fn needs_reprompt(&self) -> bool {
        match self {
            RuntimeError::Malformed { .. } | RuntimeError::Empty => true,
            RuntimeError::ClassificationFailed(cause) => cause.needs_reprompt(),
            _ => false,
        }
    }

    /// Raw service text attached to the error, if any.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            RuntimeError::Malformed { raw, .. } | RuntimeError::AdjudicationIndeterminate { raw } => {
                Some(raw)
            }
            RuntimeError::ClassificationFailed(cause) => cause.raw_reply(),
            _ => None,
        }
    }
}

impl From<InputError> for RuntimeError {
    fn from(error: InputError) -> Self {
        match error {
            InputError::EmptyAssessment(_) => RuntimeError::InsufficientInput(error),
            InputError::EmptyClaim | InputError::NonFiniteScore { .. } => {
                RuntimeError::InvalidInput(error)
            }
        }
    }
}

/// Turn an extraction outcome into a result.
pub(crate) fn extracted<T>(outcome: ExtractionOutcome<T>) -> Result<T, RuntimeError> {
    match outcome {
        ExtractionOutcome::Success(payload) => Ok(payload),
        ExtractionOutcome::Malformed { raw, error } => Err(RuntimeError::Malformed { raw, error }),
        ExtractionOutcome::Empty => Err(RuntimeError::Empty),
    }
}
