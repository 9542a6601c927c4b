//! Card-level and run-level errors

use crate::graph::CardType;
use crate::services::{CompletionError, RetrievalError, ToolError};
use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single card failed to execute
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("prompt template error: {0}")]
    Template(#[from] TemplateError),

    #[error("no executor registered for card type '{0}'")]
    Unregistered(CardType),
}

/// Where a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStage {
    MissingStart,
    DanglingEdge,
    StrandedNode,
    ExecutorError,
    Cancelled,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::MissingStart => "missing-start",
            RunStage::DanglingEdge => "dangling-edge",
            RunStage::StrandedNode => "stranded-node",
            RunStage::ExecutorError => "executor-error",
            RunStage::Cancelled => "cancelled",
        }
    }
}

/// Run controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    /// Reached an end card
    Completed,
    /// Stopped at a card with nowhere to go
    Terminated,
    Failed,
}

/// Fatal run errors; the walk stops where they happen
#[derive(Debug, Error)]
pub enum RunError {
    /// The graph can't be run at all
    #[error("{message}")]
    Configuration { message: String },

    #[error("connection '{connection_id}' from card '{from}' points to missing card '{to}'")]
    DanglingEdge {
        connection_id: String,
        from: String,
        to: String,
    },

    #[error("workflow stopped at card {label}: no outgoing connection and not an end card")]
    StrandedNode {
        card_id: String,
        card_type: CardType,
        label: String,
    },

    #[error("card {label} failed: {source}")]
    Executor {
        card_id: String,
        card_type: CardType,
        label: String,
        #[source]
        source: ExecutionError,
    },

    #[error("run cancelled before card '{card_id}'")]
    Cancelled { card_id: String },
}

impl RunError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn stage(&self) -> RunStage {
        match self {
            RunError::Configuration { .. } => RunStage::MissingStart,
            RunError::DanglingEdge { .. } => RunStage::DanglingEdge,
            RunError::StrandedNode { .. } => RunStage::StrandedNode,
            RunError::Executor { .. } => RunStage::ExecutorError,
            RunError::Cancelled { .. } => RunStage::Cancelled,
        }
    }

    /// Card the failure is attributed to, if any
    pub fn card_id(&self) -> Option<&str> {
        match self {
            RunError::Configuration { .. } => None,
            RunError::DanglingEdge { from, .. } => Some(from),
            RunError::StrandedNode { card_id, .. }
            | RunError::Executor { card_id, .. }
            | RunError::Cancelled { card_id } => Some(card_id),
        }
    }

    /// Terminal run status this error leads to
    pub fn status(&self) -> RunStatus {
        match self {
            RunError::StrandedNode { .. } => RunStatus::Terminated,
            _ => RunStatus::Failed,
        }
    }

    pub fn to_failure(&self) -> RunFailure {
        RunFailure {
            stage: self.stage(),
            card_id: self.card_id().map(str::to_string),
            message: self.to_string(),
        }
    }
}

/// Serializable failure summary handed back to callers
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFailure {
    pub stage: RunStage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    pub message: String,
}

impl From<&RunError> for RunFailure {
    fn from(err: &RunError) -> Self {
        err.to_failure()
    }
}
