/// LLM Client — the single point of entry for all inference calls in the assessment API.
///
/// ARCHITECTURAL RULE: No other module may call the inference provider directly.
/// All model interactions MUST go through `InferenceClient`.
///
/// Wire format: OpenAI-compatible chat completions (system + user messages, model, temperature).
/// No retries: rate-limit and quota failures are classified and returned to the caller.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
#[cfg(test)]
pub mod testing;

/// Upper bound for sampling temperature on assessment calls.
pub const MAX_TEMPERATURE: f32 = 0.3;
/// Longest body excerpt carried in a transport error.
const BODY_SNIPPET_CHARS: usize = 300;
/// OpenAI-style error code meaning the account is out of credit, sent with a 429.
const INSUFFICIENT_QUOTA_CODE: &str = "insufficient_quota";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited by inference provider: {message}")]
    RateLimited { message: String },

    #[error("Inference quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Inference transport error (status {status:?}): {message}")]
    Transport { status: Option<u16>, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Raw model output for one call. Untrusted until it passes the contract validator.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub raw_text: String,
    pub latency_ms: u64,
    pub model: String,
    pub temperature: f32,
}

/// Seam between the pipeline and the provider. `LlmClient` is the production implementation.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn model(&self) -> &str;

    fn temperature(&self) -> f32;

    async fn complete(&self, system: &str, user: &str) -> Result<InferenceResult, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

impl ChatResponse {
    /// Content of the first assistant message, if non-empty.
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Connection settings for the inference provider, taken from `Config`.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// HTTP client for the chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url.trim_end_matches('/')
            ),
            api_key: settings.api_key,
            model: settings.model,
            temperature: settings.temperature.clamp(0.0, MAX_TEMPERATURE),
        })
    }
}

#[async_trait]
impl InferenceClient for LlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Makes one call to the provider. Never retries.
    async fn complete(&self, system: &str, user: &str) -> Result<InferenceResult, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Transport {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_failure(status, &body);
            warn!("Inference call failed: {err}");
            return Err(err);
        }

        let parsed: ChatResponse = response.json().await?;
        let latency_ms = started.elapsed().as_millis() as u64;
        let raw_text = parsed.into_text().ok_or(LlmError::EmptyContent)?;

        debug!(
            "Inference call succeeded: model={}, latency_ms={}, chars={}",
            self.model,
            latency_ms,
            raw_text.len()
        );

        Ok(InferenceResult {
            raw_text,
            latency_ms,
            model: self.model.clone(),
            temperature: self.temperature,
        })
    }
}

/// Maps a non-2xx provider response to an error class.
///
/// 429 → rate limited (unless the body carries the provider's quota code),
/// 402 → quota exceeded, anything else → transport error with a body snippet.
pub fn classify_failure(status: u16, body: &str) -> LlmError {
    let message = snippet(body);
    match status {
        402 => LlmError::QuotaExceeded { message },
        429 if body.contains(INSUFFICIENT_QUOTA_CODE) => LlmError::QuotaExceeded { message },
        429 => LlmError::RateLimited { message },
        _ => LlmError::Transport {
            status: Some(status),
            message,
        },
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(BODY_SNIPPET_CHARS).collect();
        format!("{cut}…")
    }
}
