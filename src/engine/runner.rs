//! Graph walker: runs cards one at a time from `start` along outgoing edges
//!
//! The walk stops at an `end` card (completed), at a card with no outgoing
//! connection (terminated), or at the first failure. Nothing is retried and
//! no later card runs after a failure.

use super::envelope::OutputEnvelope;
use super::error::{ExecutionError, RunError, RunStatus};
use super::executor::{ExecutionContext, ExecutorRegistry};
use super::state::{CardStatus, RunState, StepRecord};
use crate::cli::{CancellationToken, OutputEvent, OutputHandler};
use crate::graph::{CardType, Graph};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Result of a run that reached an `end` card
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// The envelope delivered to `end`, unwrapped from `final_result`
    pub final_result: OutputEnvelope,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
    pub statuses: HashMap<String, CardStatus>,
}

/// Walks a graph with a fixed executor registry and collaborators
pub struct WorkflowRunner {
    ctx: ExecutionContext,
    registry: ExecutorRegistry,

    /// Delay before each card executes
    pacing: Duration,
}

impl WorkflowRunner {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self {
            ctx,
            registry: ExecutorRegistry::builtin(),
            pacing: Duration::ZERO,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_registry(mut self, registry: ExecutorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run the graph to completion
    pub async fn run(
        &self,
        graph: &Graph,
        output: &dyn OutputHandler,
    ) -> Result<RunOutcome, RunError> {
        self.run_with_cancellation(graph, output, &CancellationToken::new())
            .await
    }

    /// Run the graph, stopping before the next card once `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        graph: &Graph,
        output: &dyn OutputHandler,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let mut state = RunState::new(graph);
        state.begin();
        let result = self.walk(graph, output, cancel, &mut state).await;

        let duration_ms = state.elapsed_ms();
        let cards_executed = state.steps().len();

        match result {
            Ok(final_result) => {
                state.finish(RunStatus::Completed);
                tracing::info!(cards_executed, duration_ms, "Run completed");
                output.emit(OutputEvent::RunComplete {
                    status: state.run_status(),
                    duration_ms,
                    cards_executed,
                });

                let (steps, statuses) = state.into_parts();
                Ok(RunOutcome {
                    final_result,
                    steps,
                    duration_ms,
                    statuses,
                })
            }
            Err(e) => {
                state.finish(e.status());
                tracing::error!(stage = e.stage().as_str(), card_id = ?e.card_id(), error = %e, "Run failed");
                output.emit(OutputEvent::RunError {
                    stage: e.stage(),
                    card_id: e.card_id().map(str::to_string),
                    message: e.to_string(),
                });
                output.emit(OutputEvent::RunComplete {
                    status: state.run_status(),
                    duration_ms,
                    cards_executed,
                });
                Err(e)
            }
        }
    }

    async fn walk(
        &self,
        graph: &Graph,
        output: &dyn OutputHandler,
        cancel: &CancellationToken,
        state: &mut RunState,
    ) -> Result<OutputEnvelope, RunError> {
        if graph.cards.is_empty() {
            return Err(RunError::configuration("workflow has no cards"));
        }

        let mut starts = graph.start_cards();
        let Some(start) = starts.next() else {
            return Err(RunError::configuration("workflow has no start card"));
        };
        if starts.next().is_some() {
            tracing::warn!(card_id = %start.id, "Multiple start cards, running from the first");
        }

        output.emit(OutputEvent::RunStart {
            cards: graph.cards.len(),
            start_card: start.id.clone(),
        });

        let mut current = start;
        let mut previous: Option<OutputEnvelope> = None;
        let mut index = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled {
                    card_id: current.id.clone(),
                });
            }

            index += 1;
            output.emit(OutputEvent::CardStart {
                card_id: current.id.clone(),
                card_type: current.card_type,
                title: current.card_type.title().to_string(),
                index,
            });
            state.mark_running(&current.id);
            tracing::debug!(card_id = %current.id, card_type = %current.card_type, index, "Running card");

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let started = Instant::now();
            let result = match self.registry.get(current.card_type) {
                Some(executor) => executor.execute(current, previous.as_ref(), &self.ctx).await,
                None => Err(ExecutionError::Unregistered(current.card_type)),
            };

            let envelope = match result {
                Ok(envelope) => envelope,
                Err(source) => {
                    state.mark_error(&current.id);
                    output.emit(OutputEvent::CardError {
                        card_id: current.id.clone(),
                        error: source.to_string(),
                    });
                    return Err(RunError::Executor {
                        card_id: current.id.clone(),
                        card_type: current.card_type,
                        label: current.label(),
                        source,
                    });
                }
            };

            let duration = started.elapsed();
            output.emit(OutputEvent::CardComplete {
                card_id: current.id.clone(),
                duration_ms: duration.as_millis() as u64,
            });
            state.mark_success(&current.id, current.card_type, duration, envelope.clone());

            let Some(connection) = graph.outgoing(&current.id) else {
                if current.card_type == CardType::End {
                    return Ok(envelope
                        .final_result
                        .map(|inner| *inner)
                        .unwrap_or_default());
                }

                state.mark_error(&current.id);
                return Err(RunError::StrandedNode {
                    card_id: current.id.clone(),
                    card_type: current.card_type,
                    label: current.label(),
                });
            };

            current = graph
                .card(&connection.end_card_id)
                .ok_or_else(|| RunError::DanglingEdge {
                    connection_id: connection.id.clone(),
                    from: connection.start_card_id.clone(),
                    to: connection.end_card_id.clone(),
                })?;
            previous = Some(envelope);
        }
    }
}
