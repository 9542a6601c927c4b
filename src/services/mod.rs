//! External collaborators of the engine
//!
//! The executors only see three traits: [`CompletionService`],
//! [`RetrievalService`] and [`ToolService`]. Concrete implementations are
//! built here from config and injected into the engine at start-up.
//!
//! # Example
//!
//! ```ignore
//! use cardflow::services::{create_completion, CompletionService};
//!
//! let completion = create_completion(&config.completion);
//! let answer = completion.complete("你好", "THUDM/GLM-4-32B-0414").await?;
//! println!("{}", answer.text);
//! ```

mod http;
mod retry;
mod tools;
mod types;

pub use http::HttpCompletion;
pub use retry::with_retry;
pub use tools::BuiltinTools;
pub use types::{
    Completion, CompletionError, CompletionService, RetrievalError, RetrievalService,
    RetrievedChunk, RetryPolicy, ToolError, ToolService,
};

#[cfg(test)]
pub use types::ToolOutput;

use crate::config::CompletionConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Stands in when no completion endpoint is configured; fails on use
#[derive(Debug, Clone)]
pub struct UnconfiguredCompletion {
    reason: String,
}

impl UnconfiguredCompletion {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CompletionService for UnconfiguredCompletion {
    async fn complete(&self, _prompt: &str, _model: &str) -> Result<Completion, CompletionError> {
        Err(CompletionError::config(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Stands in when no document index is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredRetrieval;

#[async_trait]
impl RetrievalService for UnconfiguredRetrieval {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        Err(RetrievalError::Uninitialized)
    }
}

/// Build the completion service for a config, wrapped with retries
///
/// A missing or unusable endpoint doesn't fail here: graphs without model
/// cards still run, and the first model call reports the problem.
pub fn create_completion(config: &CompletionConfig) -> Arc<dyn CompletionService> {
    match HttpCompletion::from_config(config) {
        Ok(http) => Arc::new(with_retry(http, RetryPolicy::from_config(config))),
        Err(e) => {
            tracing::debug!(error = %e, "Completion service unavailable");
            Arc::new(UnconfiguredCompletion::new(e.to_string()))
        }
    }
}
