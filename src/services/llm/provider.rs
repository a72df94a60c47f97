//! LLM Provider Trait
//!
//! Defines the common interface for language model providers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during LLM operations.
#[derive(Debug, Clone)]
pub enum LlmError {
    AuthenticationFailed { message: String },
    RateLimited { message: String },
    InvalidRequest { message: String },
    ServerError { message: String, status: Option<u16> },
    NetworkError { message: String },
    ParseError { message: String },
    Other { message: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed { message } => {
                write!(f, "authentication failed: {}", message)
            }
            Self::RateLimited { message } => write!(f, "rate limited: {}", message),
            Self::InvalidRequest { message } => write!(f, "invalid request: {}", message),
            Self::ServerError { message, status } => {
                if let Some(code) = status {
                    write!(f, "server error (HTTP {}): {}", code, message)
                } else {
                    write!(f, "server error: {}", message)
                }
            }
            Self::NetworkError { message } => write!(f, "network error: {}", message),
            Self::ParseError { message } => write!(f, "parse error: {}", message),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Convenience alias for LLM operation results.
pub type LlmResult<T> = Result<T, LlmError>;

/// Helper to map HTTP error status codes to `LlmError`.
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed {
            message: format!("{}: {}", provider, body),
        },
        429 => LlmError::RateLimited {
            message: format!("{}: {}", provider, body),
        },
        400 => LlmError::InvalidRequest {
            message: format!("{}: {}", provider, body),
        },
        500..=599 => LlmError::ServerError {
            message: format!("{}: {}", provider, body),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("{} HTTP {}: {}", provider, status, body),
        },
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Trait that all LLM providers must implement.
///
/// The core issues free-text prompts and parses the output defensively;
/// providers only move messages and text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a conversation and return the model's text response.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> LlmResult<String>;

    /// Check that the provider is reachable with a minimal completion.
    async fn health_check(&self) -> LlmResult<()> {
        self.complete(&[ChatMessage::user("Hello")], 0.0, 10)
            .await
            .map(|_| ())
    }

    /// The model identifier used for completions.
    fn model_name(&self) -> &str;
}
