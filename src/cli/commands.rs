//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use super::signals::CancellationToken;
use crate::config::CardflowConfig;
use crate::engine::{ExecutionContext, WorkflowRunner};
use crate::graph::{CardType, Graph};
use crate::retrieval::{ChunkStore, Document};
use crate::services::{BuiltinTools, RetrievalService, UnconfiguredRetrieval, create_completion};
use crate::template::AgentPrompts;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Wire the configured collaborators into an execution context
pub fn build_context(config: &CardflowConfig) -> Result<ExecutionContext> {
    let completion = create_completion(&config.completion);

    let retrieval: Arc<dyn RetrievalService> = match config.retrieval.database_path() {
        Some(path) => Arc::new(ChunkStore::open(&path)?),
        None => {
            tracing::debug!("No retrieval database configured");
            Arc::new(UnconfiguredRetrieval)
        }
    };

    let prompts =
        AgentPrompts::from_config(&config.agent).context("Invalid [agent] prompt template")?;

    Ok(
        ExecutionContext::new(completion, retrieval, Arc::new(BuiltinTools))
            .with_prompts(prompts)
            .with_default_model(config.completion.model.clone()),
    )
}

/// Open the chunk store from an explicit path or the `[retrieval]` config
pub fn open_store(config: &CardflowConfig, database: Option<&Path>) -> Result<ChunkStore> {
    let path = database
        .map(Path::to_path_buf)
        .or_else(|| config.retrieval.database_path())
        .ok_or_else(|| {
            anyhow!("No document database configured; set [retrieval].database or pass --database")
        })?;
    ChunkStore::open(&path)
}

/// Run a graph file; exit code 0 only when an end card is reached
pub async fn run_graph(
    graph_path: &Path,
    config: &CardflowConfig,
    handler: &dyn OutputHandler,
    cancel: &CancellationToken,
) -> Result<i32> {
    let graph = Graph::load(graph_path)?;
    let ctx = build_context(config)?;

    handler.emit(OutputEvent::Info {
        message: format!("Loaded {}", graph_path.display()),
    });

    let runner = WorkflowRunner::new(ctx)
        .with_pacing(Duration::from_millis(config.defaults.pacing_delay_ms));

    match runner.run_with_cancellation(&graph, handler, cancel).await {
        Ok(outcome) => {
            for step in &outcome.steps {
                tracing::debug!(
                    card_id = %step.card_id,
                    card_type = %step.card_type,
                    duration_ms = step.duration_ms,
                    "Step finished"
                );
            }
            handler.result(true, Some(&outcome.final_result.to_pretty_json()));
            Ok(0)
        }
        Err(e) => {
            let failure = serde_json::to_string_pretty(&e.to_failure())?;
            handler.result(false, Some(&failure));
            Ok(1)
        }
    }
}

/// Check a graph file without running it
pub fn validate_graph(graph_path: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    let graph = Graph::load(graph_path)?;
    let report = graph.validate();

    for warning in &report.warnings {
        handler.emit(OutputEvent::Info {
            message: format!("  warning: {}", warning),
        });
    }

    if report.is_valid() {
        handler.emit(OutputEvent::Info {
            message: format!(
                "✓ {} is valid ({} cards, {} connections)",
                graph_path.display(),
                graph.cards.len(),
                graph.connections.len()
            ),
        });
        return Ok(0);
    }

    handler.emit(OutputEvent::Info {
        message: format!(
            "✗ {} has {} error(s):",
            graph_path.display(),
            report.errors.len()
        ),
    });
    for err in &report.errors {
        handler.emit(OutputEvent::Info {
            message: format!("  - {}", err),
        });
    }
    Ok(1)
}

/// List card types with their ports and default properties
pub fn list_cards(handler: &dyn OutputHandler) {
    for card_type in CardType::ALL {
        let defaults = card_type
            .default_properties()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        handler.emit(OutputEvent::Info {
            message: format!(
                "{:<14} {} (in: {}, out: {})  {}",
                card_type.as_str(),
                card_type.title(),
                card_type.inputs(),
                card_type.outputs(),
                defaults
            ),
        });
    }
}

/// Add text files to the chunk store; exit code 1 if any file failed
pub fn ingest_documents(
    files: &[PathBuf],
    store: &ChunkStore,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let mut failed = 0;

    for path in files {
        match ingest_file(path, store) {
            Ok(doc) => handler.emit(OutputEvent::Info {
                message: format!("✓ {} ({} chunks)", doc.name, doc.chunk_count),
            }),
            Err(e) => {
                failed += 1;
                tracing::warn!(path = %path.display(), error = %e, "Ingest failed");
                handler.emit(OutputEvent::Info {
                    message: format!("✗ {}: {:#}", path.display(), e),
                });
            }
        }
    }

    Ok(if failed == 0 { 0 } else { 1 })
}

fn ingest_file(path: &Path, store: &ChunkStore) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let source = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string();

    store.ingest(&name, &source, &text)
}

/// List ingested documents
pub fn list_documents(store: &ChunkStore, handler: &dyn OutputHandler) -> Result<()> {
    let documents = store.list_documents()?;
    if documents.is_empty() {
        handler.emit(OutputEvent::Info {
            message: "(no documents ingested)".into(),
        });
        return Ok(());
    }

    for doc in documents {
        handler.emit(OutputEvent::Info {
            message: format!(
                "{:>4}  {}  ({} chunks, {})",
                doc.id, doc.name, doc.chunk_count, doc.created_at
            ),
        });
        handler.emit(OutputEvent::Info {
            message: format!("      {}", doc.source),
        });
    }
    Ok(())
}

/// Remove one document and its chunks
pub fn delete_document(store: &ChunkStore, id: i64, handler: &dyn OutputHandler) -> Result<i32> {
    if store.delete_document(id)? {
        handler.emit(OutputEvent::Info {
            message: format!("✓ Deleted document {}", id),
        });
        Ok(0)
    } else {
        handler.emit(OutputEvent::Info {
            message: format!("✗ No document with id {}", id),
        });
        Ok(1)
    }
}
