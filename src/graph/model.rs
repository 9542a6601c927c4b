//! Graph container: loading, lookups used by the walker, and validation

use super::{Card, CardType, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors while loading a graph file
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read graph file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse graph: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cards and connections as handed over by the editor
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Graph {
    #[serde(default)]
    pub cards: Vec<Card>,

    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Problems found by [`Graph::validate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a graph from its JSON export and normalize card properties
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let mut graph: Graph = serde_json::from_str(json)?;
        graph.normalize();
        Ok(graph)
    }

    /// Load a graph file
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Make every card carry its type's default property keys
    pub fn normalize(&mut self) {
        for card in &mut self.cards {
            card.fill_defaults();
        }
    }

    /// Append a card (builder style)
    pub fn with_card(mut self, card: Card) -> Self {
        self.cards.push(card);
        self
    }

    /// Connect `from` to `to` (builder style)
    pub fn with_connection(mut self, from: &str, to: &str) -> Self {
        let id = format!("conn_{}", self.connections.len() + 1);
        self.connections.push(Connection::new(id, from, to));
        self
    }

    /// Look up a card by id
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// All start cards, in card order
    pub fn start_cards(&self) -> impl Iterator<Item = &Card> {
        self.cards
            .iter()
            .filter(|c| c.card_type == CardType::Start)
    }

    /// The start card a run begins from: the first one in card order
    pub fn find_start(&self) -> Option<&Card> {
        self.start_cards().next()
    }

    /// The outgoing connection the walker follows: the first in connection order
    pub fn outgoing(&self, card_id: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.start_card_id == card_id)
    }

    /// Check the graph without running it
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.cards.is_empty() {
            report.errors.push("graph has no cards".into());
            return report;
        }

        let mut seen_ids = HashSet::new();
        for card in &self.cards {
            if !seen_ids.insert(card.id.as_str()) {
                report.errors.push(format!("duplicate card id: {}", card.id));
            }
        }

        match self.start_cards().count() {
            0 => report.errors.push("graph needs a start card".into()),
            1 => {}
            n => report.warnings.push(format!(
                "graph has {} start cards; runs begin at the first ({})",
                n,
                self.find_start().map(|c| c.id.as_str()).unwrap_or_default()
            )),
        }

        if !self.cards.iter().any(|c| c.card_type == CardType::End) {
            report
                .warnings
                .push("graph has no end card; runs cannot complete".into());
        }

        let mut sources = HashSet::new();
        for conn in &self.connections {
            if conn.is_self_loop() {
                report.errors.push(format!(
                    "connection '{}' connects card '{}' to itself",
                    conn.id, conn.start_card_id
                ));
            }

            match self.card(&conn.start_card_id) {
                None => report.errors.push(format!(
                    "connection '{}' starts at unknown card '{}'",
                    conn.id, conn.start_card_id
                )),
                Some(card) if conn.start_port_index >= card.card_type.outputs() => {
                    report.errors.push(format!(
                        "connection '{}' uses output port {} of {}, which has {} output(s)",
                        conn.id,
                        conn.start_port_index,
                        card.label(),
                        card.card_type.outputs()
                    ))
                }
                Some(_) => {}
            }

            match self.card(&conn.end_card_id) {
                None => report.errors.push(format!(
                    "connection '{}' ends at unknown card '{}'",
                    conn.id, conn.end_card_id
                )),
                Some(card) if conn.end_port_index >= card.card_type.inputs() => {
                    report.errors.push(format!(
                        "connection '{}' uses input port {} of {}, which has {} input(s)",
                        conn.id,
                        conn.end_port_index,
                        card.label(),
                        card.card_type.inputs()
                    ))
                }
                Some(_) => {}
            }

            if !sources.insert(conn.start_card_id.as_str()) {
                report.warnings.push(format!(
                    "card '{}' has more than one outgoing connection; only the first is followed",
                    conn.start_card_id
                ));
            }
        }

        report
    }
}
