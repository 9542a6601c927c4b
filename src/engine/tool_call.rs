//! Tool-call directives embedded in model output
//!
//! Models ask for a tool by writing `调用工具 name({"arg": "value"})` somewhere
//! in their reply. Single-quoted strings are tolerated.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"调用工具\s+([A-Za-z0-9_]+)\((.*)\)").expect("tool-call pattern is valid")
});

/// A parsed tool invocation request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// A directive was found but its arguments could not be parsed
#[derive(Debug, Error)]
pub enum ToolParseError {
    #[error("invalid arguments for tool '{name}': {source} (raw: {raw})")]
    InvalidArguments {
        name: String,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Find and parse a tool-call directive
///
/// Returns `Ok(None)` when the text holds no directive.
pub fn parse_tool_call(text: &str) -> Result<Option<ToolCall>, ToolParseError> {
    let Some(captures) = DIRECTIVE.captures(text) else {
        return Ok(None);
    };

    let name = captures[1].to_string();
    let raw = captures[2].to_string();
    let normalized = raw.replace('\'', "\"");

    match serde_json::from_str(&normalized) {
        Ok(args) => Ok(Some(ToolCall { name, args })),
        Err(source) => Err(ToolParseError::InvalidArguments { name, raw, source }),
    }
}

/// Like [`parse_tool_call`], but malformed directives are logged and dropped
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    match parse_tool_call(text) {
        Ok(call) => call,
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed tool call");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_directive() {
        let text = r#"我需要搜索。调用工具 web_search({"query": "rust async"})"#;
        let call = parse_tool_call(text).unwrap().unwrap();
        assert_eq!(call.name, "web_search");
        assert_eq!(call.args, json!({"query": "rust async"}));
    }

    #[test]
    fn test_single_quotes_normalized() {
        let text = "调用工具 calculator({'expression': '2 + 3'})";
        let call = parse_tool_call(text).unwrap().unwrap();
        assert_eq!(call.name, "calculator");
        assert_eq!(call.args["expression"], "2 + 3");
    }

    #[test]
    fn test_no_directive() {
        assert!(parse_tool_call("答案是 42。").unwrap().is_none());
        assert!(parse_tool_call("call web_search({})").unwrap().is_none());
    }

    #[test]
    fn test_malformed_arguments() {
        let text = "调用工具 web_search({query: rust)";
        let err = parse_tool_call(text).unwrap_err();
        assert!(err.to_string().contains("web_search"));

        assert!(extract_tool_call(text).is_none());
    }

    #[test]
    fn test_directive_is_single_line() {
        let text = "调用工具 web_search({\"query\": \"a\"})\n后续说明 (不是参数)";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.args["query"], "a");
    }
}
