//! Card types, port arity and per-type default properties

use crate::config::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Card type - closed set, one executor per variant
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Entry point of a run
    Start,
    /// Literal text
    TextInput,
    /// Retrieve document chunks for a query
    RagContent,
    /// Single completion call
    LlmCall,
    /// Bounded think/act loop with tools
    Agent,
    /// Render text, JSON or XML
    FormatOutput,
    /// Terminal card
    End,
}

impl CardType {
    pub const ALL: [CardType; 7] = [
        CardType::Start,
        CardType::TextInput,
        CardType::RagContent,
        CardType::LlmCall,
        CardType::Agent,
        CardType::FormatOutput,
        CardType::End,
    ];

    /// Wire name, as used in graph files
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Start => "start",
            CardType::TextInput => "text_input",
            CardType::RagContent => "rag_content",
            CardType::LlmCall => "llm_call",
            CardType::Agent => "agent",
            CardType::FormatOutput => "format_output",
            CardType::End => "end",
        }
    }

    /// Display title shown on the canvas
    pub fn title(&self) -> &'static str {
        match self {
            CardType::Start => "开始",
            CardType::TextInput => "文本输入",
            CardType::RagContent => "RAG 内容",
            CardType::LlmCall => "LLM 调用",
            CardType::Agent => "Agent",
            CardType::FormatOutput => "格式化输出",
            CardType::End => "结束",
        }
    }

    /// Number of input ports
    pub fn inputs(&self) -> usize {
        match self {
            CardType::Start => 0,
            _ => 1,
        }
    }

    /// Number of output ports
    pub fn outputs(&self) -> usize {
        match self {
            CardType::End => 0,
            _ => 1,
        }
    }

    /// Fresh copy of the default property set for this type
    pub fn default_properties(&self) -> Properties {
        let mut props = Properties::new();
        match self {
            CardType::Start => {
                props.set("output", "workflow_start");
            }
            CardType::TextInput => {
                props.set("value", "默认文本");
            }
            CardType::RagContent => {
                props.set("query", "产品介绍");
                props.set("top_k", 5);
            }
            CardType::LlmCall => {
                props.set("model", DEFAULT_MODEL);
                props.set("prompt", "提示...");
            }
            CardType::Agent => {
                props.set("role", "通用助手");
                props.set("initial_prompt", "请告诉我如何解决问题。");
                props.set("tools", "web_search,calculator");
            }
            CardType::FormatOutput => {
                props.set("format", "text");
                props.set("template", "结果：{{input}}");
            }
            CardType::End => {
                props.set("result", "workflow_end");
            }
        }
        props
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar property bag attached to a card
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// String view of a property; numbers and booleans are stringified
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Integer view of a property; accepts numbers and numeric strings
    pub fn integer(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Insert every key of `defaults` that is missing here; existing values win
    pub fn fill_missing(&mut self, defaults: Properties) {
        for (key, value) in defaults.0 {
            self.0.entry(key).or_insert(value);
        }
    }
}

/// A typed unit of work on the canvas
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Card {
    /// Stable unique identifier
    pub id: String,

    /// Card type
    #[serde(rename = "type")]
    pub card_type: CardType,

    /// Canvas position (not used by the engine)
    #[serde(default)]
    pub x: f64,

    #[serde(default)]
    pub y: f64,

    /// Properties; always a superset of the type's default keys once normalized
    #[serde(default)]
    pub properties: Properties,
}

impl Card {
    /// Create a card carrying its type's default properties
    pub fn new(id: impl Into<String>, card_type: CardType) -> Self {
        Self {
            id: id.into(),
            card_type,
            x: 0.0,
            y: 0.0,
            properties: card_type.default_properties(),
        }
    }

    /// Override a single property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(key, value);
        self
    }

    /// Add any default keys the card is missing
    pub fn fill_defaults(&mut self) {
        self.properties
            .fill_missing(self.card_type.default_properties());
    }

    /// Human label for diagnostics, e.g. `LLM 调用 (card_2)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.card_type.title(), self.id)
    }
}
