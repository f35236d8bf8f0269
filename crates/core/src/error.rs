//! Error types for Sift.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM, knowledge collaborators,
//! prompts, retrieval and request admission.

use thiserror::Error;

/// Unified error type for Sift.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Library code never panics: errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors (transport, HTTP status, malformed responses)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge collaborator errors (index, metadata store, tables, arXiv)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Retrieval step errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Admission gate is at capacity
    #[error("Too many concurrent queries: {0}")]
    Overloaded(String),

    /// No chat model is configured, so queries cannot run
    #[error("Service misconfigured: {0}")]
    NotConfigured(String),

    /// The request failed boundary validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error is a request rejection rather than a pipeline failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::Overloaded(_) | AppError::NotConfigured(_) | AppError::InvalidRequest(_)
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
