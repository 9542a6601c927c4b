//! Collaborator traits the executors call into

use crate::config::CompletionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from the completion service
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// Authentication failed
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network error
    #[error("network error: {message}")]
    Network { message: String },

    /// Failed to parse response
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Provider answered 2xx with nothing in the body
    #[error("empty response body")]
    EmptyBody,

    /// Missing or invalid configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl CompletionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompletionError::Timeout { .. }
                | CompletionError::RateLimit { .. }
                | CompletionError::Network { .. }
        )
    }

    /// Get suggested retry delay for rate limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CompletionError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Fully buffered model output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,

    /// Model the request was sent to
    pub model: String,

    pub duration: Duration,
}

impl Completion {
    pub fn new(text: impl Into<String>, model: impl Into<String>, duration: Duration) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            duration,
        }
    }
}

/// Text-completion collaborator
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` to `model` and wait for the whole answer
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, CompletionError>;

    /// Service name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl CompletionService for Box<dyn CompletionService> {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, CompletionError> {
        (**self).complete(prompt, model).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Errors from the retrieval service
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// No document index has been configured or opened
    #[error("retrieval index is not initialized")]
    Uninitialized,

    #[error("retrieval storage error: {message}")]
    Storage { message: String },
}

impl RetrievalError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// One ranked chunk of retrieved text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f64,

    /// Document the chunk came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RetrievedChunk {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            score,
            source: None,
        }
    }
}

/// Content-retrieval collaborator
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Up to `top_k` chunks in descending score order
    async fn retrieve(&self, query: &str, top_k: usize)
    -> Result<Vec<RetrievedChunk>, RetrievalError>;
}

/// Errors from the tool service
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool '{tool}' failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: Value,
}

impl ToolOutput {
    pub fn new(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Tool-execution collaborator
///
/// Unknown tool names should still produce a result.
#[async_trait]
pub trait ToolService: Send + Sync {
    async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput, ToolError>;
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries
    pub max_retries: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_delay_ms),
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Up to 25% jitter
            let jitter = rand::random::<f64>() * 0.25 * capped_delay;
            capped_delay + jitter
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_error_retryable() {
        assert!(CompletionError::timeout(Duration::from_secs(30)).is_retryable());
        assert!(CompletionError::rate_limit(None).is_retryable());
        assert!(CompletionError::network("connection reset").is_retryable());

        assert!(!CompletionError::auth("invalid token").is_retryable());
        assert!(!CompletionError::parse("invalid json").is_retryable());
        assert!(!CompletionError::EmptyBody.is_retryable());
        assert!(!CompletionError::config("no url").is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = CompletionError::rate_limit(Some(Duration::from_secs(5)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert_eq!(CompletionError::network("x").retry_after(), None);
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(30));
    }

    #[test]
    fn test_retry_policy_with_jitter() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            jitter: true,
            ..Default::default()
        };

        let delay = policy.delay_for_attempt(0);
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_millis(1250));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = CompletionConfig {
            max_retries: 7,
            retry_delay_ms: 250,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_error_display() {
        assert!(CompletionError::EmptyBody.to_string().contains("empty"));
        assert!(RetrievalError::Uninitialized.to_string().contains("not initialized"));
        let err = ToolError::failed("calculator", "boom");
        assert_eq!(err.to_string(), "tool 'calculator' failed: boom");
    }
}
