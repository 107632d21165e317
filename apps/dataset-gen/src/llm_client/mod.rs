/// LLM Client: the single point of entry for all text-generation calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// Every request is filtered through the capability registry before dispatch.
///
/// The client performs exactly one round trip per call and never retries;
/// retry policy belongs to the caller (see `retry::RetryPolicy`).
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod capabilities;
pub mod prompts;
pub mod retry;

use capabilities::{ModelCapabilityRegistry, RequestParams};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Transport failures, rate limits, server errors, and unusable model
    /// output are worth another attempt. Other API errors (auth, bad request)
    /// are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::Parse(_) | LlmError::EmptyContent => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completions request after capability filtering.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(flatten)]
    pub params: &'a RequestParams,
}

/// Transport seam. The production implementation talks HTTP; tests script replies.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, LlmError>;
}

/// Sampling settings requested by the caller, before capability filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_p: f64,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub max_tokens: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.9,
            presence_penalty: 0.3,
            frequency_penalty: 0.4,
            max_tokens: None,
        }
    }
}

impl GenerationSettings {
    /// Expands the settings into a parameter mapping. Zero penalties are omitted.
    pub fn requested_params(&self) -> RequestParams {
        let mut params = RequestParams::new();
        params.insert("temperature".into(), self.temperature.into());
        params.insert("top_p".into(), self.top_p.into());
        if self.presence_penalty != 0.0 {
            params.insert("presence_penalty".into(), self.presence_penalty.into());
        }
        if self.frequency_penalty != 0.0 {
            params.insert("frequency_penalty".into(), self.frequency_penalty.into());
        }
        if let Some(max_tokens) = self.max_tokens {
            params.insert("max_tokens".into(), max_tokens.into());
        }
        params
    }
}

/// The single LLM client used by every generation stage.
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
    registry: Arc<ModelCapabilityRegistry>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ChatBackend>, registry: Arc<ModelCapabilityRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Sends a full multi-turn message list and returns the generated text.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        requested: &RequestParams,
    ) -> Result<String, LlmError> {
        let params = self.registry.build_request_params(model, requested);
        let request = ChatRequest {
            model,
            messages,
            params: &params,
        };

        debug!(
            "LLM request: model={}, messages={}, params={:?}",
            model,
            messages.len(),
            params.keys().collect::<Vec<_>>()
        );

        let text = self.backend.chat(&request).await?;
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }

    /// Sends a single flat prompt as one user message.
    #[allow(dead_code)]
    pub async fn complete_prompt(
        &self,
        prompt: &str,
        model: &str,
        requested: &RequestParams,
    ) -> Result<String, LlmError> {
        self.complete(&[ChatMessage::user(prompt)], model, requested)
            .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible HTTP backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Talks to any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if status.as_u16() == 429 || status.is_server_error() {
                warn!("LLM API returned {}: {}", status, message);
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&response.text().await?)?;

        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                request.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
