//! Outbound completion client.
//!
//! The pipeline produces exactly one prompt string per upstream attempt; this
//! module sends it to the external generative endpoint as a JSON chat request
//! and extracts the text of the first choice. The [`CompletionClient`] trait
//! is the seam the reading service is generic over, so tests script responses
//! without any network.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::utilities::errors::DivinationError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
/// Default completion token cap.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Configuration for the completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible endpoint (no trailing slash).
    pub base_url: String,
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Create a config with default generation parameters.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read the endpoint configuration from `DUANGDEE_LLM_BASE_URL`,
    /// `DUANGDEE_LLM_API_KEY` and `DUANGDEE_LLM_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns an API error naming the first missing variable.
    pub fn from_env() -> Result<Self, DivinationError> {
        let get = |name: &str| {
            std::env::var(name)
                .map_err(|_| DivinationError::api(format!("missing environment variable {}", name)))
        };
        Ok(Self::new(
            get("DUANGDEE_LLM_BASE_URL")?,
            get("DUANGDEE_LLM_API_KEY")?,
            get("DUANGDEE_LLM_MODEL")?,
        ))
    }
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt, returning the completion text.
    async fn complete(&self, prompt: &str) -> Result<String, DivinationError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpCompletionClient {
    /// Build a client for the given endpoint configuration.
    pub fn new(config: LlmConfig) -> Result<Self, DivinationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, DivinationError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(model = %self.config.model, prompt_chars = prompt.chars().count(), "sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(DivinationError::api(format!(
                "completion endpoint returned {}: {}",
                status, snippet
            )));
        }

        let payload: Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                DivinationError::api("completion response has no choices[0].message.content")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LlmConfig::new("https://api.example.com/v1", "key", "fortune-1");
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_request_body_shape() {
        let client =
            HttpCompletionClient::new(LlmConfig::new("https://api.example.com/v1", "key", "m"))
                .unwrap();
        let body = client.request_body("ทำนายดวง");
        assert_eq!(body["model"], "m");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "ทำนายดวง");
    }
}
