//! Embedding Provider Abstraction
//!
//! Defines the async `EmbeddingProvider` trait and supporting types for
//! pluggable embedding backends, plus the explicit `RetryPolicy` value the
//! client layer applies to transient failures.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during embedding operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingError {
    /// Authentication failed (invalid or missing API key).
    AuthenticationFailed { message: String },

    /// Rate limit exceeded. `retry_after` is the provider's suggested wait
    /// in seconds, when it sent one.
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// A network or connection error occurred (includes timeouts).
    NetworkError { message: String },

    /// The provider is not reachable.
    ProviderUnavailable { message: String },

    /// The provider returned an HTTP error.
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// The provider returned an unexpected or unparseable response.
    ParseError { message: String },

    /// The input batch exceeds the provider's maximum batch size.
    BatchSizeLimitExceeded {
        requested: usize,
        max_allowed: usize,
    },

    /// Configuration is invalid or incomplete.
    InvalidConfig { message: String },

    /// Any other error.
    Other { message: String },
}

impl fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::RateLimited { message, .. } => write!(f, "rate limited: {}", message),
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ProviderUnavailable { message } => {
                write!(f, "provider unavailable: {}", message)
            }
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::BatchSizeLimitExceeded {
                requested,
                max_allowed,
            } => write!(
                f,
                "batch size {} exceeds maximum {}",
                requested, max_allowed
            ),
            Self::InvalidConfig { message } => write!(f, "invalid config: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for EmbeddingError {}

impl EmbeddingError {
    /// Whether this error is transient and the operation should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EmbeddingError::RateLimited { .. }
                | EmbeddingError::NetworkError { .. }
                | EmbeddingError::ProviderUnavailable { .. }
                | EmbeddingError::ServerError { .. }
        )
    }

    /// For rate-limited errors, the provider's suggested wait in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        if let EmbeddingError::RateLimited { retry_after, .. } = self {
            *retry_after
        } else {
            None
        }
    }
}

/// Convenience alias for embedding operation results.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Explicit retry policy applied by [`super::EmbeddingClient`].
///
/// Modeled as a value rather than hardcoded constants so tests can inject a
/// zero base delay and exercise the retry loop without sleeping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: usize,
    /// Backoff base; attempt `n` (0-based) waits `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Cap on any single backoff wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy with no backoff delay, for tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff for the given 0-based attempt, capped.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(16) as u32;
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

// ---------------------------------------------------------------------------
// Embedding provider trait
// ---------------------------------------------------------------------------

/// Async trait for embedding providers.
///
/// Implementations produce dense vector representations of text. The trait
/// is object-safe and requires `Send + Sync` so a provider can be shared
/// across Tokio tasks behind an `Arc`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts into dense vectors, one per input, in input
    /// order. All returned vectors have the same dimensionality.
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Check that the provider is reachable and credentialed, via a
    /// trivial embedding call.
    async fn health_check(&self) -> EmbeddingResult<()> {
        self.embed_batch(&["health check"]).await.map(|_| ())
    }

    /// Dimensionality of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Model identifier, echoed into node embedding metadata.
    fn model_name(&self) -> &str;

    /// Maximum number of texts accepted in a single `embed_batch` call.
    fn max_batch_size(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
