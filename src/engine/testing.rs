//! Scripted collaborators for engine tests

use super::executor::ExecutionContext;
use crate::services::{
    Completion, CompletionError, CompletionService, RetrievalError, RetrievalService,
    RetrievedChunk, ToolError, ToolOutput, ToolService,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays queued responses, then repeats a fallback
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            fallback: String::new(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with the same text
    pub fn always(text: &str) -> Self {
        let mut scripted = Self::new(&[]);
        scripted.fallback = text.to_string();
        scripted
    }

    pub fn failing(error: CompletionError) -> Self {
        let scripted = Self::new(&[]);
        scripted.responses.lock().unwrap().push_back(Err(error));
        scripted
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(prompt, model)` of every call so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), model.to_string()));

        let next = self.responses.lock().unwrap().pop_front();
        let text = match next {
            Some(response) => response?,
            None => self.fallback.clone(),
        };
        Ok(Completion::new(text, model, Duration::ZERO))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Returns a fixed chunk list and records queries
#[derive(Default)]
pub struct StaticRetrieval {
    chunks: Vec<RetrievedChunk>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticRetrieval {
    pub fn new(texts: &[&str]) -> Self {
        let count = texts.len() as f64;
        Self {
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, text)| RetrievedChunk::new(*text, (count - i as f64) / count))
                .collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// `(query, top_k)` of every call so far
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalService for StaticRetrieval {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), top_k));
        Ok(self.chunks.clone())
    }
}

/// Answers `"<name> ok"` (or fails, if built with [`RecordingTools::failing`])
/// and records calls
#[derive(Default)]
pub struct RecordingTools {
    calls: Mutex<Vec<(String, Value)>>,
    failure: Option<String>,
}

impl RecordingTools {
    /// Every call fails with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolService for RecordingTools {
    async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), args.clone()));
        match &self.failure {
            Some(message) => Err(ToolError::failed(name, message.as_str())),
            None => Ok(ToolOutput::new(format!("{} ok", name))),
        }
    }
}

/// Handles to the mocks behind a test context
pub struct Mocks {
    pub completion: Arc<ScriptedCompletion>,
    pub retrieval: Arc<StaticRetrieval>,
    pub tools: Arc<RecordingTools>,
}

impl Mocks {
    pub fn new(completion: ScriptedCompletion, retrieval: StaticRetrieval) -> Self {
        Self {
            completion: Arc::new(completion),
            retrieval: Arc::new(retrieval),
            tools: Arc::new(RecordingTools::default()),
        }
    }

    pub fn with_tools(mut self, tools: RecordingTools) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.completion.clone(),
            self.retrieval.clone(),
            self.tools.clone(),
        )
    }
}

impl Default for Mocks {
    fn default() -> Self {
        Self::new(ScriptedCompletion::always("ok"), StaticRetrieval::default())
    }
}
