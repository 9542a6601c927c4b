//! Per-run bookkeeping: card statuses and the executed-step log

use super::envelope::OutputEnvelope;
use super::error::RunStatus;
use crate::graph::{CardType, Graph};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Execution status of one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Pending,
    Running,
    Success,
    Error,
}

/// One executed card
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub card_id: String,
    pub card_type: CardType,
    pub duration_ms: u64,
    pub output: OutputEnvelope,
}

/// Mutable state of a single run
#[derive(Debug)]
pub struct RunState {
    status: RunStatus,
    statuses: HashMap<String, CardStatus>,
    steps: Vec<StepRecord>,
    started: Instant,
}

impl RunState {
    /// Every card of the graph starts out pending
    pub fn new(graph: &Graph) -> Self {
        Self {
            status: RunStatus::Idle,
            statuses: graph
                .cards
                .iter()
                .map(|c| (c.id.clone(), CardStatus::Pending))
                .collect(),
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Current run status
    pub fn run_status(&self) -> RunStatus {
        self.status
    }

    /// `Idle` to `Running`
    pub fn begin(&mut self) {
        self.status = RunStatus::Running;
    }

    /// Record the terminal status
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
    }

    pub fn mark_running(&mut self, card_id: &str) {
        self.statuses.insert(card_id.to_string(), CardStatus::Running);
    }

    pub fn mark_success(
        &mut self,
        card_id: &str,
        card_type: CardType,
        duration: Duration,
        output: OutputEnvelope,
    ) {
        self.statuses.insert(card_id.to_string(), CardStatus::Success);
        self.steps.push(StepRecord {
            card_id: card_id.to_string(),
            card_type,
            duration_ms: duration.as_millis() as u64,
            output,
        });
    }

    pub fn mark_error(&mut self, card_id: &str) {
        self.statuses.insert(card_id.to_string(), CardStatus::Error);
    }

    #[cfg(test)]
    pub fn status(&self, card_id: &str) -> Option<CardStatus> {
        self.statuses.get(card_id).copied()
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Consume into the step log and final statuses
    pub fn into_parts(self) -> (Vec<StepRecord>, HashMap<String, CardStatus>) {
        (self.steps, self.statuses)
    }
}
