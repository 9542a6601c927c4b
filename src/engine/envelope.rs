//! The output envelope threaded from card to card

use super::tool_call::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope fields a template binding can read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Value,
    Text,
    Content,
    ToolResult,
}

/// Output of one card, input of the next
///
/// Every field is optional; producers set a subset and consumers read the
/// fields they understand in a fixed precedence order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OutputEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Box<OutputEnvelope>>,

    /// Last model response of an agent that ran out of iterations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_incomplete_response: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutputEnvelope {
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn from_formatted(formatted: impl Into<String>) -> Self {
        Self {
            formatted_text: Some(formatted.into()),
            ..Default::default()
        }
    }

    /// Wrap the envelope an end card received
    pub fn wrap_final(previous: OutputEnvelope) -> Self {
        Self {
            final_result: Some(Box::new(previous)),
            ..Default::default()
        }
    }

    pub fn with_tool_call(mut self, call: Option<ToolCall>) -> Self {
        self.tool_call = call;
        self
    }

    pub fn with_tool_result(mut self, result: Value) -> Self {
        self.tool_result = Some(result);
        self
    }

    /// String view of a field, if present
    pub fn field(&self, field: Field) -> Option<String> {
        match field {
            Field::Value => self.value.clone(),
            Field::Text => self.text.clone(),
            Field::Content => self.content.clone(),
            Field::ToolResult => self
                .tool_result
                .as_ref()
                .filter(|v| !v.is_null())
                .map(display_value),
        }
    }

    /// The whole envelope as 2-space indented JSON
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}

/// Coerce a JSON value to text: strings verbatim, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
