//! Completion endpoint configuration

use serde::{Deserialize, Serialize};

/// Model used when a card doesn't name one
pub const DEFAULT_MODEL: &str = "THUDM/GLM-4-32B-0414";

/// `[completion]`: an OpenAI-compatible chat endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Base URL, e.g. `https://api.siliconflow.cn/v1`
    pub url: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Environment variable holding the API key, used when `api_key` is unset
    pub api_key_env: Option<String>,

    /// Fallback model for cards with an empty `model`
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout in seconds for requests
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_key_env: None,
            model: default_model(),
            timeout: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl CompletionConfig {
    /// The API key, read from `api_key_env` when not set inline
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty())
        })
    }

    /// Merge another layer into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        let defaults = Self::default();

        if other.url.is_some() {
            self.url = other.url;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_key_env.is_some() {
            self.api_key_env = other.api_key_env;
        }
        if other.model != defaults.model {
            self.model = other.model;
        }
        if other.timeout != defaults.timeout {
            self.timeout = other.timeout;
        }
        if other.temperature != defaults.temperature {
            self.temperature = other.temperature;
        }
        if other.max_tokens != defaults.max_tokens {
            self.max_tokens = other.max_tokens;
        }
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if other.retry_delay_ms != defaults.retry_delay_ms {
            self.retry_delay_ms = other.retry_delay_ms;
        }
    }
}
