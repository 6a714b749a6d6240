use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Wire-shape request sent to the configured LLM provider: `model`,
/// `messages[]`, `temperature`, `max_tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Normalized response: just the assistant text and token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("failed to parse provider response: {0}")]
    Parse(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Only transport-level failures are worth retrying; a parse or
    /// provider-side rejection will not succeed on replay.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProviderError::Transport(_))
    }
}

/// LLM completion contract consumed by Understanding and Refiner.
///
/// Deliberately narrower than a full agent-runtime provider trait: no tool
/// calls, no streaming, no auth refresh — this system treats the LLM purely
/// as a prompt-in/text-out collaborator.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}
