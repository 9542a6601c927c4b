//! Workflow execution engine
//!
//! This module provides:
//! - The output envelope passed from card to card
//! - One executor per card type, looked up through a registry
//! - The bounded agent loop
//! - The graph walker and its run/failure taxonomy
//!
//! # Example
//!
//! ```ignore
//! use cardflow::engine::{ExecutionContext, WorkflowRunner};
//!
//! let ctx = ExecutionContext::new(completion, retrieval, tools);
//! let outcome = WorkflowRunner::new(ctx).run(&graph, &*handler).await?;
//! println!("{}", outcome.final_result.to_pretty_json());
//! ```

mod agent;
mod cards;
mod envelope;
mod error;
mod executor;
mod format;
mod runner;
mod state;
mod tool_call;

#[cfg(test)]
mod testing;

pub use envelope::{Field, OutputEnvelope, display_value};
pub use error::{RunStage, RunStatus};
pub use executor::ExecutionContext;
pub use runner::WorkflowRunner;
