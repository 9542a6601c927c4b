//! Agent prompt clause overrides

use serde::{Deserialize, Serialize};

/// `[agent]`: minijinja templates replacing the built-in clauses
///
/// `tools_clause` sees `tools` (a list), `tool_result_clause` sees `tool`
/// and `result`, `unavailable_tool_clause` sees `tool`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentPromptConfig {
    pub tools_clause: Option<String>,
    pub no_tools_clause: Option<String>,
    pub answer_clause: Option<String>,
    pub tool_result_clause: Option<String>,
    pub unavailable_tool_clause: Option<String>,
}

impl AgentPromptConfig {
    pub fn merge(&mut self, other: Self) {
        if other.tools_clause.is_some() {
            self.tools_clause = other.tools_clause;
        }
        if other.no_tools_clause.is_some() {
            self.no_tools_clause = other.no_tools_clause;
        }
        if other.answer_clause.is_some() {
            self.answer_clause = other.answer_clause;
        }
        if other.tool_result_clause.is_some() {
            self.tool_result_clause = other.tool_result_clause;
        }
        if other.unavailable_tool_clause.is_some() {
            self.unavailable_tool_clause = other.unavailable_tool_clause;
        }
    }
}
