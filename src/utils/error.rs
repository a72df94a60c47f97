//! Error Handling
//!
//! Unified error types for the service core.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Service-wide error type.
///
/// `Validation` failures are raised before any upstream call and are never
/// retried. `Provider` and `Store` failures surface only after the
/// corresponding retry policy is exhausted. LLM shape problems never reach
/// callers as errors; they are absorbed with documented defaults.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or out-of-bounds input, rejected before any work.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (missing API keys, bad endpoints).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding provider failed after the retry budget was exhausted.
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// Graph store call failed.
    #[error("Graph store error: {0}")]
    Store(String),

    /// Language model transport failure.
    #[error("Language model error: {0}")]
    Llm(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for service errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
