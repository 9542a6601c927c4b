//! Directed connections between card ports

use serde::{Deserialize, Serialize};

/// A directed edge from one card's output port to another card's input port
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,

    pub start_card_id: String,

    #[serde(default)]
    pub start_port_index: usize,

    pub end_card_id: String,

    #[serde(default)]
    pub end_port_index: usize,
}

impl Connection {
    /// Connect port 0 of `from` to port 0 of `to`
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_card_id: from.into(),
            start_port_index: 0,
            end_card_id: to.into(),
            end_port_index: 0,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.start_card_id == self.end_card_id
    }
}
