//! CLI module for cardflow
//!
//! This module provides:
//! - Command implementations (run, validate, cards, ingest, documents)
//! - Output handlers (console, JSON, quiet) the runner reports status through
//! - Signal handling for cancelling a run between cards
//!
//! # Example
//!
//! ```ignore
//! use cardflow::cli::{commands, output, signals};
//!
//! let handler = output::create_handler(output::OutputMode::Console);
//! let token = signals::CancellationToken::new();
//! let exit_code = commands::run_graph(path, &config, &*handler, &token).await?;
//! ```

pub mod commands;
pub mod output;
pub mod signals;

pub use commands::{
    delete_document, ingest_documents, list_cards, list_documents, open_store, run_graph,
    validate_graph,
};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
pub use signals::{CancellationToken, setup_signal_handlers};
