//! `format_output`: render the previous output as text, JSON or XML

use super::envelope::{Field, OutputEnvelope};
use super::error::ExecutionError;
use super::executor::{CardExecutor, ExecutionContext};
use crate::graph::Card;
use crate::template::{strip_unresolved, substitute};
use async_trait::async_trait;
use serde_json::{Value, json};

const JSON_ERROR: &str = "Invalid JSON format in template or input could not be parsed as JSON";

/// Output format of a `format_output` card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Xml,
}

impl OutputFormat {
    /// Parse from a property value; unknown formats render as text
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "xml" => Self::Xml,
            _ => Self::Text,
        }
    }

    pub fn render(&self, rendered: &str) -> String {
        match self {
            OutputFormat::Text => rendered.to_string(),
            OutputFormat::Json => render_json(rendered),
            OutputFormat::Xml => render_xml(rendered),
        }
    }
}

/// Fill `{{input}}` from the first present of text, value, content, or the
/// whole envelope as indented JSON
pub fn fill_template(template: &str, previous: Option<&OutputEnvelope>) -> String {
    let mut rendered = template.to_string();
    if let Some(prev) = previous {
        let input = [Field::Text, Field::Value, Field::Content]
            .into_iter()
            .find_map(|field| prev.field(field))
            .unwrap_or_else(|| prev.to_pretty_json());
        substitute(&mut rendered, "input", &input);
    }
    strip_unresolved(&rendered)
}

/// Re-serialize as 2-space indented JSON; plain text is wrapped as `{"result": ...}`
///
/// Never fails: unparseable input yields an error object instead.
pub fn render_json(rendered: &str) -> String {
    let trimmed = rendered.trim();
    let parsed = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str::<Value>(rendered)
    } else {
        Ok(json!({ "result": rendered }))
    };

    let value = match parsed {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Format output is not valid JSON");
            json!({ "error": JSON_ERROR, "template_content": rendered })
        }
    };

    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Escape and wrap as `<response><data>...</data></response>`
pub fn render_xml(rendered: &str) -> String {
    let escaped = rendered
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;");
    format!("<response><data>{}</data></response>", escaped)
}

pub struct FormatOutputExecutor;

#[async_trait]
impl CardExecutor for FormatOutputExecutor {
    async fn execute(
        &self,
        card: &Card,
        previous: Option<&OutputEnvelope>,
        _ctx: &ExecutionContext,
    ) -> Result<OutputEnvelope, ExecutionError> {
        let template = card.properties.text("template").unwrap_or_default();
        let format = OutputFormat::parse(&card.properties.text("format").unwrap_or_default());

        let rendered = fill_template(&template, previous);
        Ok(OutputEnvelope::from_formatted(format.render(&rendered)))
    }
}
