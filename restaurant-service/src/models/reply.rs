//! Response model for the assistant pipeline.

use serde::{Deserialize, Serialize};

/// Token consumption across every model call made for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// What the assistant returns for a user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    /// The user query with surrounding whitespace trimmed.
    pub query: String,

    /// Tool that produced `result`.
    pub action: String,

    /// Tool input actually executed.
    pub params: serde_json::Value,

    /// Retrieved restaurant data.
    pub result: serde_json::Value,

    /// Natural-language recommendation composed from `result`, when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// True when the model's tool choice was unavailable and the default search ran.
    pub fallback: bool,

    pub usage: TokenUsage,
}
