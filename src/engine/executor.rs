//! Executor trait, injected collaborators and the type-to-executor registry

use super::agent::AgentExecutor;
use super::cards::{EndExecutor, LlmCallExecutor, RagContentExecutor, StartExecutor, TextInputExecutor};
use super::envelope::OutputEnvelope;
use super::error::ExecutionError;
use super::format::FormatOutputExecutor;
use crate::config::DEFAULT_MODEL;
use crate::graph::{Card, CardType};
use crate::services::{CompletionService, RetrievalService, ToolService};
use crate::template::AgentPrompts;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators and settings shared by every executor in a run
#[derive(Clone)]
pub struct ExecutionContext {
    pub completion: Arc<dyn CompletionService>,
    pub retrieval: Arc<dyn RetrievalService>,
    pub tools: Arc<dyn ToolService>,
    pub prompts: AgentPrompts,

    /// Model for `llm_call` cards whose `model` is blank
    pub default_model: String,
}

impl ExecutionContext {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        retrieval: Arc<dyn RetrievalService>,
        tools: Arc<dyn ToolService>,
    ) -> Self {
        Self {
            completion,
            retrieval,
            tools,
            prompts: AgentPrompts::default(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_prompts(mut self, prompts: AgentPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

/// Run-time behavior of one card type
#[async_trait]
pub trait CardExecutor: Send + Sync {
    /// Map the card's properties and the previous output to this card's output
    async fn execute(
        &self,
        card: &Card,
        previous: Option<&OutputEnvelope>,
        ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError>;
}

/// Lookup table from card type to executor
pub struct ExecutorRegistry {
    executors: HashMap<CardType, Box<dyn CardExecutor>>,
}

impl ExecutorRegistry {
    pub fn empty() -> Self {
        Self {
            executors: HashMap::new(),
        }
    }

    /// One executor per built-in card type
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(CardType::Start, StartExecutor);
        registry.register(CardType::TextInput, TextInputExecutor);
        registry.register(CardType::RagContent, RagContentExecutor);
        registry.register(CardType::LlmCall, LlmCallExecutor);
        registry.register(CardType::Agent, AgentExecutor);
        registry.register(CardType::FormatOutput, FormatOutputExecutor);
        registry.register(CardType::End, EndExecutor);
        registry
    }

    /// Add or replace the executor for a type
    pub fn register(&mut self, card_type: CardType, executor: impl CardExecutor + 'static) {
        self.executors.insert(card_type, Box::new(executor));
    }

    pub fn get(&self, card_type: CardType) -> Option<&dyn CardExecutor> {
        self.executors.get(&card_type).map(|e| e.as_ref())
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_type() {
        let registry = ExecutorRegistry::builtin();
        for card_type in CardType::ALL {
            assert!(registry.get(card_type).is_some(), "missing {}", card_type);
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = ExecutorRegistry::empty();
        assert!(registry.get(CardType::Start).is_none());
    }
}
