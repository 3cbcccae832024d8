//! Language model provider abstractions and implementations.
//!
//! The assistant talks to the model through [`TextProvider`], so the hosted
//! Anthropic backend and the deterministic mock are interchangeable.

pub mod anthropic;
pub mod mock;

use crate::models::TokenUsage;
use crate::services::tools::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Errors worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::RateLimited | ProviderError::NetworkError(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::InvalidRequest(_) => "invalid_request",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an Anthropic `stop_reason`.
    pub fn from_stop_reason(stop_reason: Option<&str>) -> Self {
        match stop_reason {
            Some("end_turn") | Some("stop_sequence") | None => FinishReason::Complete,
            Some("max_tokens") => FinishReason::Length,
            Some("tool_use") => FinishReason::ToolUse,
            Some("refusal") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Error,
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Outcome of asking the model to pick a tool.
#[derive(Debug, Clone)]
pub struct ToolSelection {
    /// First `tool_use` block of the reply, if any.
    pub tool_use: Option<ToolUse>,

    /// Any text the model produced alongside (or instead of) the tool call.
    pub text: Option<String>,

    pub usage: TokenUsage,

    pub finish_reason: FinishReason,
}

/// Result of a text generation.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: Option<String>,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

/// Generation parameters for model requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// System prompt.
    pub system: Option<String>,

    /// Temperature (0.0 - 1.0).
    pub temperature: Option<f32>,

    /// Top-p sampling.
    pub top_p: Option<f32>,

    /// Maximum output tokens. Providers fall back to their configured default.
    pub max_tokens: Option<u32>,

    /// Stop sequences.
    pub stop_sequences: Vec<String>,
}

/// Retrieved data handed to the model as grounding context.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Tool that produced the data.
    pub source: String,

    /// Serialized tool result.
    pub content: String,
}

/// Trait for text generation providers (e.g., Anthropic).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Ask the model to choose exactly one of `tools` for `query`.
    async fn select_tool(
        &self,
        query: &str,
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<ToolSelection, ProviderError>;

    /// Generate a free-text answer grounded in `context`.
    async fn generate(
        &self,
        prompt: &str,
        context: &[RetrievedContext],
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
