//! Output handlers for CLI commands
//!
//! The runner reports card and run status through an [`OutputHandler`].
//! Supports console (pretty), JSON, and quiet output modes.

use crate::engine::{RunStage, RunStatus};
use crate::graph::CardType;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Parse from string
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "quiet" => Self::Quiet,
            _ => Self::Console,
        }
    }
}

/// Events emitted while a graph runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    RunStart {
        cards: usize,
        start_card: String,
    },
    CardStart {
        card_id: String,
        card_type: CardType,
        title: String,
        index: usize,
    },
    CardComplete {
        card_id: String,
        duration_ms: u64,
    },
    CardError {
        card_id: String,
        error: String,
    },
    RunComplete {
        status: RunStatus,
        duration_ms: u64,
        cards_executed: usize,
    },
    RunError {
        stage: RunStage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        card_id: Option<String>,
        message: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write final result
    fn result(&self, success: bool, output: Option<&str>);
}

/// Console output handler
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::RunStart { cards, start_card } => {
                eprintln!("Running {} cards from '{}'", cards, start_card);
            }
            OutputEvent::CardStart {
                card_id,
                title,
                index,
                ..
            } => {
                eprint!("[{}] {} ({})... ", index, title, card_id);
                let _ = io::stderr().flush();
            }
            OutputEvent::CardComplete { duration_ms, .. } => {
                eprintln!("✓ ({})", Self::format_duration(duration_ms));
            }
            OutputEvent::CardError { error, .. } => {
                eprintln!("✗");
                eprintln!("  {}", error);
            }
            OutputEvent::RunComplete {
                status,
                duration_ms,
                cards_executed,
            } => {
                eprintln!();
                match status {
                    RunStatus::Completed => eprintln!(
                        "✓ Run completed ({} cards in {})",
                        cards_executed,
                        Self::format_duration(duration_ms)
                    ),
                    other => eprintln!(
                        "✗ Run {:?} after {} cards ({})",
                        other,
                        cards_executed,
                        Self::format_duration(duration_ms)
                    ),
                }
            }
            OutputEvent::RunError {
                stage, message, ..
            } => {
                eprintln!("Error [{}]: {}", stage.as_str(), message);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
        }
    }

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// JSON output handler, one object per line
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, output: Option<&str>) {
        #[derive(Serialize)]
        struct FinalResult<'a> {
            success: bool,
            output: Option<&'a str>,
        }

        self.print_json(&FinalResult { success, output });
    }
}

/// Prints only the final result
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, _event: OutputEvent) {}

    fn result(&self, _success: bool, output: Option<&str>) {
        if let Some(out) = output {
            println!("{}", out);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

/// Collects events for assertions
#[cfg(test)]
#[derive(Default)]
pub struct RecordingHandler {
    events: std::sync::Mutex<Vec<OutputEvent>>,
}

#[cfg(test)]
impl RecordingHandler {
    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl OutputHandler for RecordingHandler {
    fn emit(&self, event: OutputEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn result(&self, _success: bool, _output: Option<&str>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_from_str() {
        assert_eq!(OutputMode::from_str("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_str("QUIET"), OutputMode::Quiet);
        assert_eq!(OutputMode::from_str("console"), OutputMode::Console);
        assert_eq!(OutputMode::from_str("unknown"), OutputMode::Console);
    }

    #[test]
    fn test_recording_handler_captures_events() {
        let handler = RecordingHandler::default();

        handler.emit(OutputEvent::RunStart {
            cards: 3,
            start_card: "s".into(),
        });
        handler.emit(OutputEvent::CardComplete {
            card_id: "s".into(),
            duration_ms: 4,
        });

        assert_eq!(handler.events().len(), 2);
    }

    #[test]
    fn test_console_format_duration() {
        assert_eq!(ConsoleHandler::format_duration(500), "500ms");
        assert_eq!(ConsoleHandler::format_duration(1000), "1.0s");
        assert_eq!(ConsoleHandler::format_duration(2500), "2.5s");
    }

    #[test]
    fn test_event_wire_format() {
        let event = OutputEvent::CardStart {
            card_id: "c1".into(),
            card_type: CardType::LlmCall,
            title: "LLM 调用".into(),
            index: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CardStart");
        assert_eq!(json["card_type"], "llm_call");

        let event = OutputEvent::RunError {
            stage: RunStage::MissingStart,
            card_id: None,
            message: "workflow has no start card".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "missing-start");
        assert!(json.get("card_id").is_none());
    }

    #[test]
    fn test_create_handler() {
        let _ = create_handler(OutputMode::Console);
        let _ = create_handler(OutputMode::Json);
        let _ = create_handler(OutputMode::Quiet);
    }
}
