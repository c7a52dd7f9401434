use async_trait::async_trait;
use bookmatch_core::errors::BookMatchError;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// One chat-completion call. Serializes to the request body the completion
/// endpoint expects.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    MissingApiKey,
    #[error("llm transport failed: {0}")]
    Transport(String),
    #[error("llm rate limit exceeded")]
    RateLimited,
    #[error("llm returned status {status}")]
    Status { status: u16 },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response carried no message content")]
    EmptyCompletion,
}

impl From<LlmError> for BookMatchError {
    fn from(error: LlmError) -> Self {
        match error {
            LlmError::RateLimited => Self::RateLimited,
            LlmError::Decode(_) | LlmError::EmptyCompletion => {
                Self::MalformedResponse(error.to_string())
            }
            LlmError::MissingApiKey | LlmError::Transport(_) | LlmError::Status { .. } => {
                Self::Upstream(error.to_string())
            }
        }
    }
}

/// Chat-completion backend. Returns the first choice's message text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}
