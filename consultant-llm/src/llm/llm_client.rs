use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
    Client as OpenAiClient,
};
use consultant_core::{RagError, SamplingConfig, Settings};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for the LLM client
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub max_tokens: u32,
    pub requests_per_minute: u32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// OpenAI-compatible endpoint; `None` uses the SDK default
    pub api_base: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            requests_per_minute: 10,
            timeout_seconds: 30,
            max_retries: 3,
            api_base: None,
        }
    }
}

impl LlmConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model: settings.llm_model.clone(),
            max_tokens: settings.llm_max_tokens,
            requests_per_minute: settings.llm_requests_per_minute,
            timeout_seconds: settings.llm_timeout_seconds,
            max_retries: settings.llm_max_retries,
            api_base: settings.openai_api_base.clone(),
        }
    }
}

/// Response from the LLM with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub raw_response: String,
    pub model: String,
    pub tokens_used: Option<u32>,
}

/// A chat model that completes a prompt under the given sampling parameters.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn complete(&self, prompt: &str, sampling: SamplingConfig) -> Result<LlmResponse>;
}

/// OpenAI-compatible LLM client with rate limiting and retry logic
pub struct LlmClient {
    openai_client: OpenAiClient<OpenAIConfig>,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration
    ///
    /// # Arguments
    /// * `config` - LLM configuration
    /// * `api_key` - API key; when `None` the SDK reads `OPENAI_API_KEY` itself
    ///
    /// No request is made here, so a missing or wrong key only surfaces when
    /// a completion is requested.
    pub fn new(config: LlmConfig, api_key: Option<String>) -> Result<Self> {
        tracing::info!(
            "Initializing LLM client: model={}, rate_limit={}/min, max_retries={}",
            config.model,
            config.requests_per_minute,
            config.max_retries
        );

        let mut openai_config = OpenAIConfig::new();
        if let Some(key) = api_key {
            openai_config = openai_config.with_api_key(key);
        }
        if let Some(base) = &config.api_base {
            tracing::info!("Using OpenAI-compatible endpoint: {}", base);
            openai_config = openai_config.with_api_base(base);
        }
        let openai_client = OpenAiClient::with_config(openai_config);

        // Initialize rate limiter
        let requests_per_minute = NonZeroU32::new(config.requests_per_minute)
            .ok_or_else(|| RagError::Config("requests_per_minute must be > 0".to_string()))?;

        let quota = Quota::per_minute(requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            openai_client,
            rate_limiter,
            config,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(LlmConfig::from_settings(settings), settings.openai_api_key.clone())
    }

    /// Build the chat completion request for a prompt
    pub fn build_request(&self, prompt: &str, sampling: SamplingConfig) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                },
            )],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(sampling.temperature),
            top_p: Some(sampling.top_p),
            ..Default::default()
        }
    }

    /// Call the API once, bounded by the configured timeout
    async fn call_openai(&self, prompt: &str, sampling: SamplingConfig) -> Result<LlmResponse> {
        let request = self.build_request(prompt, sampling);

        let response = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_seconds),
            self.openai_client.chat().create(request),
        )
        .await
        .map_err(|_| {
            RagError::Llm(format!(
                "request timed out after {}s",
                self.config.timeout_seconds
            ))
        })?
        .map_err(|e| RagError::Llm(format!("OpenAI API error: {}", e)))?;

        // Extract response text
        let response_text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RagError::Llm("Empty response from LLM".to_string()))?;

        Ok(LlmResponse {
            raw_response: response_text,
            model: response.model.clone(),
            tokens_used: response.usage.map(|u| u.total_tokens),
        })
    }
}

impl ChatModel for LlmClient {
    /// Complete a prompt
    ///
    /// This method:
    /// 1. Validates the sampling parameters (no request is made if invalid)
    /// 2. Rate limits the request
    /// 3. Calls the LLM API with retries and exponential backoff
    async fn complete(&self, prompt: &str, sampling: SamplingConfig) -> Result<LlmResponse> {
        sampling.validate()?;

        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        tracing::debug!(
            "Sending prompt to LLM (length: {} chars, {})",
            prompt.len(),
            sampling
        );

        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            match self.call_openai(prompt, sampling).await {
                Ok(response) => {
                    tracing::info!(
                        "LLM response received: model={}, tokens={:?}, length={} chars",
                        response.model,
                        response.tokens_used,
                        response.raw_response.len()
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if attempt + 1 < self.config.max_retries {
                        let backoff_ms = 2_u64.pow(attempt) * 1000; // Exponential backoff
                        tracing::warn!(
                            "LLM call failed (attempt {}/{}), retrying in {}ms: {}",
                            attempt + 1,
                            self.config.max_retries,
                            backoff_ms,
                            e
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("All retry attempts failed")))
    }
}
