//! HTTP client for the Anthropic Messages API.
//!
//! Sends one user message per prompt and returns the concatenated text blocks
//! of the reply. Transient failures are retried with back-off (see
//! [`crate::retry`]); the API key is validated at construction so a missing
//! credential fails before any batch runs.
//!
//! Batch prompts get an output budget of [`MAX_TOKENS`] per item up to
//! [`MAX_OUTPUT_TOKENS`], and a reply stopped by that budget is an error
//! rather than a half-written JSON document.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use oppdb_core::AppConfig;

use crate::backend::AnalysisBackend;
use crate::error::AnalyzerError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Output budget for a single-item prompt.
pub const MAX_TOKENS: u32 = 1500;
/// Upper bound on any request's output budget.
pub const MAX_OUTPUT_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.3;
const STOP_MAX_TOKENS: &str = "max_tokens";

/// Client for the Anthropic Messages API.
///
/// Use [`AnthropicClient::new`] for production or
/// [`AnthropicClient::with_base_url`] to point at a mock server in tests.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    messages_url: Url,
    max_retries: u32,
    batch_max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::MissingCredential`] if `api_key` is blank, or
    /// [`AnalyzerError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, AnalyzerError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// - [`AnalyzerError::MissingCredential`] if `api_key` is blank.
    /// - [`AnalyzerError::InvalidBaseUrl`] if `base_url` does not parse.
    /// - [`AnalyzerError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AnalyzerError> {
        if api_key.trim().is_empty() {
            return Err(AnalyzerError::MissingCredential(
                "Anthropic API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("oppdb/0.1 (feedback-analysis)")
            .build()?;

        let normalised = format!("{}/v1/messages", base_url.trim_end_matches('/'));
        let messages_url = Url::parse(&normalised).map_err(|e| AnalyzerError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            messages_url,
            max_retries: 3,
            batch_max_retries: 1,
            backoff_base_ms: 1_000,
        })
    }

    /// Builds a client from the loaded application config, including its
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`AnthropicClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalyzerError> {
        Ok(Self::with_base_url(
            &config.anthropic_api_key,
            &config.ai_model,
            config.request_timeout_secs,
            &config.anthropic_base_url,
        )?
        .with_retry_policy(config.max_retries, config.retry_backoff_base_ms))
    }

    /// Overrides the retry policy. `max_retries = 0` disables retries.
    ///
    /// Batch calls never retry more often than single-item calls.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.batch_max_retries = self.batch_max_retries.min(max_retries);
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Overrides the retry budget of batch calls (default 1).
    #[must_use]
    pub fn with_batch_retries(mut self, batch_max_retries: u32) -> Self {
        self.batch_max_retries = batch_max_retries;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one request without retrying.
    async fn send_once(&self, prompt: &str, max_tokens: u32) -> Result<String, AnalyzerError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature: TEMPERATURE,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.messages_url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalyzerError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| AnalyzerError::Deserialize {
                context: "messages response".to_string(),
                source: e,
            })?;

        if parsed.stop_reason.as_deref() == Some(STOP_MAX_TOKENS) {
            return Err(AnalyzerError::TruncatedCompletion { max_tokens });
        }

        let text = join_text_blocks(&parsed.content);
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyCompletion);
        }
        Ok(text)
    }
}

impl AnalysisBackend for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.send_once(prompt, MAX_TOKENS)
        })
        .await
    }

    async fn complete_batch(&self, prompt: &str, items: usize) -> Result<String, AnalyzerError> {
        let max_tokens = batch_max_tokens(items);
        retry_with_backoff(self.batch_max_retries, self.backoff_base_ms, || {
            self.send_once(prompt, max_tokens)
        })
        .await
    }
}

/// [`MAX_TOKENS`] per item, capped at [`MAX_OUTPUT_TOKENS`].
fn batch_max_tokens(items: usize) -> u32 {
    let items = u32::try_from(items.max(1)).unwrap_or(u32::MAX);
    MAX_TOKENS.saturating_mul(items).min(MAX_OUTPUT_TOKENS)
}

/// Concatenates the `text` blocks of a reply, skipping tool-use and other block types.
fn join_text_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}
