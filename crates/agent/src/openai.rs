use std::time::Duration;

use async_trait::async_trait;
use bookmatch_core::config::LlmConfig;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm::{ChatRequest, LlmClient, LlmError};

/// Chat-completions client with bearer authentication.
pub struct OpenAiChatClient {
    http: Client,
    endpoint: String,
    api_key: SecretString,
}

impl OpenAiChatClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self { http, endpoint: endpoint.into(), api_key })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or(LlmError::MissingApiKey)?;
        Self::new(
            config.base_url.trim_end_matches('/'),
            api_key,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        debug!(
            event_name = "llm.request.sent",
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(event_name = "llm.request.rejected", status = status.as_u16(), "non-success status");
            return Err(classify_status(status));
        }

        let body = response.text().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        parse_completion(&body)
    }
}

fn classify_status(status: StatusCode) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited
    } else {
        LlmError::Status { status: status.as_u16() }
    }
}

/// First choice's message text from a chat-completion response body.
pub fn parse_completion(body: &str) -> Result<String, LlmError> {
    let payload: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|error| LlmError::Decode(error.to_string()))?;

    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::EmptyCompletion)
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::{classify_status, parse_completion, OpenAiChatClient};
    use crate::llm::LlmError;

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"title\":\"데미안\"}"}},{"index":1,"message":{"role":"assistant","content":"second"}}]}"#;

        assert_eq!(parse_completion(body), Ok("{\"title\":\"데미안\"}".to_owned()));
    }

    #[test]
    fn missing_content_is_an_empty_completion() {
        assert_eq!(parse_completion(r#"{"choices":[]}"#), Err(LlmError::EmptyCompletion));
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(LlmError::EmptyCompletion)
        );
    }

    #[test]
    fn undecodable_body_is_a_decode_error() {
        assert!(matches!(parse_completion("<html>bad gateway</html>"), Err(LlmError::Decode(_))));
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), LlmError::RateLimited);
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            LlmError::Status { status: 503 }
        );
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let result = OpenAiChatClient::new(
            "https://api.openai.com/v1/chat/completions",
            String::from("  ").into(),
            Duration::from_secs(5),
        );

        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }
}
