//! Resilient Embedding Client
//!
//! Wraps an [`EmbeddingProvider`] with retry/backoff for transient failures
//! and transparent batch chunking by the provider's limit. Results are
//! order-preserving: `embed_many(texts)` returns exactly one vector per
//! input text, in input order.
//!
//! There is deliberately no caching here. Content edits change duplicate
//! detection semantics downstream, so every call must observe the current
//! text.

use std::sync::Arc;
use std::time::Duration;

use super::provider::{EmbeddingError, EmbeddingProvider, RetryPolicy};
use crate::utils::error::{AppError, AppResult};

/// Retry-aware client over a shared embedding provider.
///
/// Shared via `Arc<EmbeddingClient>` across concurrent sub-batches; the
/// provider behind it must support concurrent calls (the HTTP providers do,
/// their connection pools handle acquisition internally).
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    /// Dimensionality of produced vectors.
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Model identifier of the underlying provider.
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vectors = self.embed_many(&[text]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::provider("provider returned no vector for single input"))
    }

    /// Embed many texts, preserving order and length.
    ///
    /// Inputs are chunked by the provider's `max_batch_size`; each chunk is
    /// retried per the policy. Any chunk failing past the retry budget fails
    /// the whole call — partial vectors are never returned.
    pub async fn embed_many(&self, texts: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.provider.max_batch_size().max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(chunk_size) {
            let batch = self.embed_chunk_with_retry(chunk).await?;
            if batch.len() != chunk.len() {
                return Err(AppError::provider(format!(
                    "provider returned {} vectors for {} inputs",
                    batch.len(),
                    chunk.len()
                )));
            }
            vectors.extend(batch);
        }
        Ok(vectors)
    }

    /// One chunk, up to `retry.max_attempts` attempts.
    ///
    /// Rate-limit responses wait the provider-suggested interval when one
    /// was sent, otherwise exponential backoff; both share the same attempt
    /// budget. Non-retryable errors return immediately.
    async fn embed_chunk_with_retry(&self, chunk: &[&str]) -> AppResult<Vec<Vec<f32>>> {
        let mut last_err: Option<EmbeddingError> = None;

        for attempt in 0..self.retry.max_attempts {
            match self.provider.embed_batch(chunk).await {
                Ok(vectors) => return Ok(vectors),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(AppError::provider(err.to_string()));
                    }

                    let wait = err
                        .retry_after_secs()
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| self.retry.delay_for(attempt));

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "embedding call failed, backing off"
                    );

                    last_err = Some(err);
                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        let cause = last_err.map(|e| e.to_string()).unwrap_or_default();
        Err(AppError::provider(format!(
            "embedding failed after {} attempts: {}",
            self.retry.max_attempts, cause
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
