//! Error types for docchat.
//!
//! One enum covers every failure category. The split between `Retrieval` and
//! `Generation` mirrors how a conversation turn degrades: a retrieval failure
//! is absorbed into an ungrounded answer, a generation failure fails the turn.

use thiserror::Error;

/// Unified error type for docchat.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider transport errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Vector store unreachable or returned garbage
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The answer for a turn could not be generated
    #[error("Generation error: {0}")]
    Generation(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the session can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Retrieval(_) | AppError::Generation(_) | AppError::Llm(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
