use crate::services::assistant::AssistantSettings;
use crate::services::providers::anthropic::{AnthropicConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATA_PATH: &str = "restaurant-service/data/restaurants.json";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_RETRY_MAX_ELAPSED_SECS: u64 = 10;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 120;

#[derive(Debug, Clone)]
pub struct RestaurantConfig {
    pub common: core_config::Config,
    pub environment: String,
    pub dataset: DatasetConfig,
    pub assistant: AssistantConfig,
    pub anthropic: AnthropicSettings,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// JSON file holding the restaurant records.
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub provider: ProviderKind,
    pub model: String,
    /// Output token cap per model call.
    pub max_tokens: u32,
    /// Compose a natural-language answer after retrieval.
    pub compose_answer: bool,
    pub retry_max_elapsed_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AnthropicSettings {
    pub api_key: Secret<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client IP per minute.
    pub per_minute: u32,
}

/// Which language model backend answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "ASSISTANT_PROVIDER must be 'anthropic' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

impl RestaurantConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the config from `lookup` instead of the process environment.
    pub fn from_lookup(
        common: core_config::Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string());
        let is_prod = environment == "prod";
        let setting = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let provider: ProviderKind = setting("ASSISTANT_PROVIDER", Some("anthropic"))?.parse()?;

        // The key is only mandatory when the hosted model is in use.
        let api_key = match provider {
            ProviderKind::Anthropic => setting("ANTHROPIC_API_KEY", Some(""))?,
            ProviderKind::Mock => lookup("ANTHROPIC_API_KEY").unwrap_or_default(),
        };

        Ok(RestaurantConfig {
            common,
            dataset: DatasetConfig {
                path: setting("RESTAURANT_DATA_PATH", Some(DEFAULT_DATA_PATH))?,
            },
            assistant: AssistantConfig {
                provider,
                model: setting("ASSISTANT_MODEL", Some(DEFAULT_MODEL))?,
                max_tokens: setting(
                    "ASSISTANT_MAX_TOKENS",
                    Some(DEFAULT_MAX_TOKENS.to_string().as_str()),
                )?
                .parse()
                .unwrap_or(DEFAULT_MAX_TOKENS),
                compose_answer: parse_bool(&setting("ASSISTANT_COMPOSE_ANSWER", Some("true"))?)
                    .unwrap_or(true),
                retry_max_elapsed_secs: setting(
                    "ASSISTANT_RETRY_MAX_ELAPSED_SECS",
                    Some(DEFAULT_RETRY_MAX_ELAPSED_SECS.to_string().as_str()),
                )?
                .parse()
                .unwrap_or(DEFAULT_RETRY_MAX_ELAPSED_SECS),
            },
            anthropic: AnthropicSettings {
                api_key: Secret::new(api_key),
                base_url: setting("ANTHROPIC_BASE_URL", Some(DEFAULT_BASE_URL))?,
            },
            rate_limit: RateLimitConfig {
                per_minute: setting(
                    "RATE_LIMIT_PER_MINUTE",
                    Some(DEFAULT_RATE_LIMIT_PER_MINUTE.to_string().as_str()),
                )?
                .parse()
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
            },
            environment,
        })
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        AnthropicConfig {
            api_key: self.anthropic.api_key.clone(),
            base_url: self.anthropic.base_url.clone(),
            model: self.assistant.model.clone(),
            max_tokens: self.assistant.max_tokens,
            max_retry_elapsed: Duration::from_secs(self.assistant.retry_max_elapsed_secs),
        }
    }

    pub fn assistant_settings(&self) -> AssistantSettings {
        AssistantSettings {
            compose_answer: self.assistant.compose_answer,
            max_tokens: self.assistant.max_tokens,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn get_env(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError> {
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
