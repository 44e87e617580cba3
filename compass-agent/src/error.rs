//! Gateway error types.

use compass_model::BlueprintError;

use crate::backend::traits::BackendError;
use crate::schema::SchemaViolation;

/// Failure of a single generation call.
///
/// Nothing is retried. The caller decides whether to show the message and
/// let the student try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The model answered, but not with something we can use
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The provider throttled the request
    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    /// The request never completed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider rejected or failed the request
    #[error("Generation failed: {0}")]
    Failed(String),
}

/// How the shell should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    RateLimited,
    Generic,
}

impl GenerationError {
    pub fn category(&self) -> FailureCategory {
        match self {
            GenerationError::RateLimited { .. } => FailureCategory::RateLimited,
            _ => FailureCategory::Generic,
        }
    }

    /// Short text suitable for showing to the student.
    pub fn user_message(&self) -> &'static str {
        match self {
            GenerationError::RateLimited { .. } => "Try again shortly.",
            GenerationError::Transport(_) => "Connection lost. Please try again.",
            GenerationError::MalformedResponse(_) | GenerationError::Failed(_) => "Please retry.",
        }
    }

    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        GenerationError::MalformedResponse(reason.to_string())
    }
}

impl From<BackendError> for GenerationError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::RateLimited { retry_after_ms } => {
                GenerationError::RateLimited { retry_after_ms }
            }
            BackendError::NetworkError(msg) => GenerationError::Transport(msg),
            BackendError::ParseError(msg) => GenerationError::MalformedResponse(msg),
            BackendError::ContentBlocked { reason } => {
                GenerationError::Failed(format!("Content blocked: {reason}"))
            }
            BackendError::Unavailable(msg) | BackendError::RequestFailed(msg) => {
                GenerationError::Failed(msg)
            }
        }
    }
}

impl From<BlueprintError> for GenerationError {
    fn from(e: BlueprintError) -> Self {
        GenerationError::malformed(e)
    }
}

impl From<SchemaViolation> for GenerationError {
    fn from(e: SchemaViolation) -> Self {
        GenerationError::malformed(e)
    }
}
