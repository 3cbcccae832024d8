//! Anthropic provider implementation.
//!
//! Talks to the Messages API directly over HTTPS. Tool selection sends the
//! restaurant tools with `tool_choice = any`, so the model must answer with a
//! `tool_use` block. Answer composition is a plain completion with the
//! retrieved data in the user turn.

use super::{
    FinishReason, GenerationParams, ProviderError, ProviderResponse, RetrievedContext,
    TextProvider, ToolSelection, ToolUse,
};
use crate::models::TokenUsage;
use crate::services::tools::ToolDefinition;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Anthropic provider configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on time spent retrying rate limits and network failures.
    pub max_retry_elapsed: Duration,
}

/// Anthropic text provider.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, prompt: String, params: &'a GenerationParams) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: params.max_tokens.unwrap_or(self.config.max_tokens),
            system: params.system.as_deref(),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            tools: None,
            tool_choice: None,
            temperature: params.temperature,
            top_p: params.top_p,
            stop_sequences: (!params.stop_sequences.is_empty())
                .then_some(params.stop_sequences.as_slice()),
        }
    }

    /// Send a request, retrying transient failures with exponential backoff.
    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, ProviderError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.config.max_retry_elapsed),
            ..Default::default()
        };

        retry(backoff, || async {
            self.send_once(request).await.map_err(|e| {
                if e.is_transient() {
                    tracing::warn!(error = %e, "Anthropic request failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    async fn send_once(
        &self,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, ProviderError> {
        tracing::debug!(
            model = %self.config.model,
            tools = request.tools.map_or(0, |t| t.len()),
            "Sending request to Anthropic API"
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &error_text));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        if FinishReason::from_stop_reason(api_response.stop_reason.as_deref())
            == FinishReason::ContentFilter
        {
            return Err(ProviderError::ContentFiltered);
        }

        Ok(api_response)
    }
}

fn map_http_error(status: StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimited,
        401 => ProviderError::NotConfigured("Anthropic API rejected the API key".to_string()),
        _ => ProviderError::ApiError(format!("Anthropic API error {}: {}", status, body)),
    }
}

/// Render retrieved tool results ahead of the user's question.
fn grounded_prompt(prompt: &str, context: &[RetrievedContext]) -> String {
    let mut text = String::new();
    for item in context {
        text.push_str(&format!("<{}>\n{}\n</{}>\n\n", item.source, item.content, item.source));
    }
    text.push_str(prompt);
    text
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn select_tool(
        &self,
        query: &str,
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<ToolSelection, ProviderError> {
        if tools.is_empty() {
            return Err(ProviderError::InvalidRequest("No tools to choose from".to_string()));
        }

        let mut request = self.request(query.to_string(), params);
        request.tools = Some(tools);
        request.tool_choice = Some(ToolChoice::Any);

        let response = self.send(&request).await?;
        let finish_reason = FinishReason::from_stop_reason(response.stop_reason.as_deref());
        let usage = response.usage.into();

        let mut tool_use = None;
        let mut text = None;
        for block in response.content {
            match block {
                ContentBlock::ToolUse { id, name, input } if tool_use.is_none() => {
                    tool_use = Some(ToolUse { id, name, input });
                }
                ContentBlock::Text { text: t } if text.is_none() => text = Some(t),
                _ => {}
            }
        }

        Ok(ToolSelection {
            tool_use,
            text,
            usage,
            finish_reason,
        })
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &[RetrievedContext],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.request(grounded_prompt(prompt, context), params);
        let response = self.send(&request).await?;

        let text: Vec<String> = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect();

        Ok(ProviderResponse {
            text: (!text.is_empty()).then(|| text.join("")),
            usage: response.usage.into(),
            finish_reason: FinishReason::from_stop_reason(response.stop_reason.as_deref()),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "ANTHROPIC_API_KEY is not set".to_string(),
            ));
        }
        Ok(())
    }
}

// Messages API types

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolChoice {
    Any,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::new(usage.input_tokens, usage.output_tokens)
    }
}
