//! OpenAI chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use quill_core::{ChatModel, GenerationConfig, ModelError, Result};

/// The default chat-completions endpoint.
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// The default chat model.
const DEFAULT_MODEL: &str = "gpt-4";

/// A [`ChatModel`] backed by the OpenAI chat-completions API.
///
/// Uses `reqwest` to call `/v1/chat/completions` directly. A custom base URL
/// makes it work against any OpenAI-compatible server.
///
/// # Configuration
///
/// - `model` – defaults to `gpt-4`.
/// - `api_key` – from the constructor or the `OPENAI_API_KEY` environment
///   variable.
/// - `timeout` – optional per-request deadline; expiry surfaces as
///   [`ModelError::Request`].
///
/// # Example
///
/// ```rust,ignore
/// use quill_model::OpenAiChat;
///
/// let model = OpenAiChat::new("sk-...")?.with_model("gpt-4o-mini");
/// let answer = model.generate(system, user, &config).await?;
/// ```
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiChat {
    /// Create a new client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            url: OPENAI_CHAT_URL.into(),
        })
    }

    /// Create a client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ModelError::Config("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Set the model name (e.g. `gpt-4o-mini`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at an OpenAI-compatible chat-completions endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.url = format!("{}/chat/completions", base.trim_end_matches('/'));
        self
    }

    /// Set a per-request timeout.
    ///
    /// Expiry is reported as [`ModelError::Request`]; the caller decides
    /// whether to retry, the client never does.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        debug!(
            model = %self.model,
            max_tokens = config.max_tokens,
            temperature = config.temperature,
            "chat completion request"
        );

        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "request failed");
                ModelError::Request { model: self.model.clone(), message: format!("{e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(model = %self.model, %status, "API error");
            return Err(ModelError::Response {
                model: self.model.clone(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(model = %self.model, error = %e, "failed to parse response");
            ModelError::Response {
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::Response {
                model: self.model.clone(),
                message: "API returned no choices".into(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(OpenAiChat::new(""), Err(ModelError::Config(_))));
    }

    #[test]
    fn base_url_override_targets_chat_completions() {
        let client = OpenAiChat::new("key").unwrap().with_base_url("http://localhost:11434/v1/");
        assert_eq!(client.url, "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn name_reflects_model_override() {
        let client = OpenAiChat::new("key").unwrap().with_model("gpt-4o-mini");
        assert_eq!(client.name(), "gpt-4o-mini");
    }
}
