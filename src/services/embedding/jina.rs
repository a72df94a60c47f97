//! Jina Embedding Provider
//!
//! Implements the `EmbeddingProvider` trait for the Jina AI embeddings API
//! using reqwest HTTP transport.
//!
//! ## API Details
//!
//! - Endpoint: `POST https://api.jina.ai/v1/embeddings`
//! - Auth: `Authorization: Bearer {api_key}`
//! - Body: `{ model, input: ["text1", ...], encoding_format: "float" }`
//!   (v4 models take `input: [{"text": ...}, ...]` instead)
//! - Response: `{ data: [{ embedding, index }], model, usage }`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::utils::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default Jina embedding API endpoint.
const JINA_API_URL: &str = "https://api.jina.ai/v1/embeddings";

/// Default embedding model.
const DEFAULT_MODEL: &str = "jina-embeddings-v2-base-en";

/// Embedding dimension of the default model.
const DEFAULT_DIMENSION: usize = 768;

/// Maximum texts per request accepted by the API.
const MAX_BATCH_SIZE: usize = 128;

/// Per-request timeout. A timeout counts as one attempt against the
/// client's retry budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the Jina embedding provider.
#[derive(Debug, Clone)]
pub struct JinaConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub dimension: usize,
}

impl JinaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: JINA_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Read configuration from the environment. `JINA_API_KEY` is required;
    /// `JINA_API_URL` and `JINA_MODEL` override the defaults.
    pub fn from_env() -> AppResult<Self> {
        let api_key = std::env::var("JINA_API_KEY").map_err(|_| {
            AppError::config(
                "JINA_API_KEY environment variable is required for embedding generation",
            )
        })?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("JINA_API_URL") {
            config.api_url = url;
        }
        if let Ok(model) = std::env::var("JINA_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct JinaEmbeddingResponse {
    data: Vec<JinaEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct JinaEmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct JinaErrorResponse {
    detail: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// Jina embedding provider.
///
/// The reqwest `Client` is internally pooled and clone-safe, so one provider
/// instance can serve concurrent sub-batches without sharing a connection.
pub struct JinaEmbeddingProvider {
    client: reqwest::Client,
    config: JinaConfig,
}

impl JinaEmbeddingProvider {
    pub fn new(config: JinaConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::config("Jina API key must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Build the JSON request body. v4 models use the object input form.
    fn build_request_body(&self, texts: &[&str]) -> serde_json::Value {
        if self.config.model.starts_with("jina-embeddings-v4") {
            let input: Vec<serde_json::Value> = texts
                .iter()
                .map(|t| serde_json::json!({ "text": t }))
                .collect();
            serde_json::json!({ "model": self.config.model, "input": input })
        } else {
            serde_json::json!({
                "model": self.config.model,
                "input": texts,
                "encoding_format": "float",
            })
        }
    }

    /// Map a reqwest transport error to `EmbeddingError`.
    fn map_reqwest_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::NetworkError {
                message: format!("request to {} timed out", self.config.api_url),
            }
        } else if err.is_connect() {
            EmbeddingError::ProviderUnavailable {
                message: format!("cannot connect to {}: {}", self.config.api_url, err),
            }
        } else {
            EmbeddingError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    /// Map an HTTP error response to `EmbeddingError`.
    fn map_http_error(&self, status: u16, retry_after: Option<u64>, body: &str) -> EmbeddingError {
        let detail = serde_json::from_str::<JinaErrorResponse>(body)
            .ok()
            .and_then(|r| r.detail)
            .unwrap_or_else(|| body.to_string());

        match status {
            401 => EmbeddingError::AuthenticationFailed {
                message: format!(
                    "Jina API authentication failed: {}. Verify JINA_API_KEY is correct.",
                    detail
                ),
            },
            429 => EmbeddingError::RateLimited {
                message: format!("Jina API rate limit exceeded: {}", detail),
                retry_after,
            },
            500..=599 => EmbeddingError::ServerError {
                message: format!("Jina API error: {}", detail),
                status: Some(status),
            },
            _ => EmbeddingError::ServerError {
                message: format!("Jina API unexpected error: {}", detail),
                status: Some(status),
            },
        }
    }

    /// Sort by index and extract vectors, verifying the count matches.
    fn extract_embeddings(
        &self,
        mut response: JinaEmbeddingResponse,
        expected_count: usize,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        if response.data.len() != expected_count {
            return Err(EmbeddingError::ParseError {
                message: format!(
                    "expected {} embeddings but Jina returned {}",
                    expected_count,
                    response.data.len()
                ),
            });
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for JinaEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > MAX_BATCH_SIZE {
            return Err(EmbeddingError::BatchSizeLimitExceeded {
                requested: texts.len(),
                max_allowed: MAX_BATCH_SIZE,
            });
        }

        let body = self.build_request_body(texts);
        let response = self
            .client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status().as_u16();
        if status == 200 {
            let parsed = response
                .json::<JinaEmbeddingResponse>()
                .await
                .map_err(|e| EmbeddingError::ParseError {
                    message: format!("failed to parse embedding response: {}", e),
                })?;
            self.extract_embeddings(parsed, texts.len())
        } else {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body_text = response.text().await.unwrap_or_default();
            Err(self.map_http_error(status, retry_after, &body_text))
        }
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
