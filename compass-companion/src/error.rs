//! Companion error types.

use compass_agent::GenerationError;
use compass_model::TaskError;
use compass_store::StoreError;

/// Error types for companion operations.
#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    /// Model call failed; state was left as it was
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Durable write failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Planner input rejected
    #[error("Invalid task: {0}")]
    Task(#[from] TaskError),

    /// Onboarding has not been completed
    #[error("No student profile - complete onboarding first")]
    NoProfile,

    /// No learning path is active
    #[error("No active learning path")]
    NoActivePath,

    /// The active path has been finished
    #[error("Active path has no current milestone")]
    NoCurrentMilestone,

    /// Referenced path does not exist
    #[error("Unknown path: {0}")]
    UnknownPath(String),

    /// Onboarding form rejected
    #[error("Invalid onboarding: {0}")]
    InvalidOnboarding(String),

    /// A mentor reply is still in flight
    #[error("Mentor is still replying")]
    Busy,

    /// Nothing to send
    #[error("Message is empty")]
    EmptyMessage,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CompanionError {
    /// Short text for the student, when the shell wants one.
    pub fn user_message(&self) -> &'static str {
        match self {
            CompanionError::Generation(e) => e.user_message(),
            CompanionError::Store(_) => "Could not save your progress. Please try again.",
            CompanionError::Task(_) => "That time slot is not valid.",
            CompanionError::NoProfile => "Finish setting up your profile first.",
            CompanionError::NoActivePath | CompanionError::UnknownPath(_) => {
                "Choose a learning path first."
            }
            CompanionError::NoCurrentMilestone => "This path is complete.",
            CompanionError::InvalidOnboarding(_) => "Please check your details.",
            CompanionError::Busy => "Your mentor is still replying.",
            CompanionError::EmptyMessage => "Type a message first.",
            CompanionError::Config(_) => "Companion is not configured.",
        }
    }
}
