//! OpenRouter Provider
//!
//! Implementation of the `LlmProvider` trait for the OpenRouter API
//! (OpenAI-compatible chat completions).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::provider::{parse_http_error, ChatMessage, ChatRole, LlmError, LlmProvider, LlmResult};
use crate::utils::error::{AppError, AppResult};

/// Default OpenRouter API base URL.
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default completion model.
const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4.5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Attribution headers OpenRouter uses for ranking/analytics.
const REFERER_HEADER: &str = "https://brain.ft.tc";
const TITLE_HEADER: &str = "MCP Brain Service";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the OpenRouter provider.
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Read configuration from the environment. `OPENROUTER_API_KEY` is
    /// required; base URL and default model can be overridden.
    pub fn from_env() -> AppResult<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| AppError::config("OPENROUTER_API_KEY environment variable is required"))?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("OPENROUTER_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("OPENROUTER_DEFAULT_MODEL") {
            config.model = model;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// OpenRouter chat-completion provider.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::config("OpenRouter API key must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn role_name(role: ChatRole) -> &'static str {
        match role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> LlmResult<String> {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({ "role": Self::role_name(m.role), "content": m.content }))
            .collect();

        let body = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", REFERER_HEADER)
            .header("X-Title", TITLE_HEADER)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body_text, "openrouter"));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::ParseError {
                message: format!("failed to parse completion response: {}", e),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseError {
                message: "completion response contained no choices".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
