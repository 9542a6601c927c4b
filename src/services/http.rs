//! OpenAI-compatible streaming completion over HTTP

use super::types::{Completion, CompletionError, CompletionService};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Completion service backed by a `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct HttpCompletion {
    /// Base URL for the API
    base_url: String,

    /// API key (if required)
    api_key: Option<String>,

    temperature: f32,
    max_tokens: u32,

    /// Whole-request timeout
    timeout: Duration,

    client: reqwest::Client,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Non-streaming response, for providers that ignore `stream: true`
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl HttpCompletion {
    /// Create from the `[completion]` config section
    pub fn from_config(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| CompletionError::config("completion.url is not set"))?;

        let timeout = Duration::from_secs(config.timeout);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            api_key: config.resolve_api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
            client,
        })
    }

    /// Build the chat completion URL
    fn chat_completion_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Map HTTP status to CompletionError
    fn map_http_error(&self, status: reqwest::StatusCode, body: &str) -> CompletionError {
        match status.as_u16() {
            401 | 403 => CompletionError::auth(format!("HTTP {}: {}", status, body)),
            429 => CompletionError::rate_limit(parse_retry_after(body)),
            408 | 504 => CompletionError::timeout(self.timeout),
            400..=499 => CompletionError::config(format!("HTTP {}: {}", status, body)),
            500..=599 => CompletionError::network(format!("HTTP {}: {}", status, body)),
            _ => CompletionError::network(format!("unexpected HTTP {}: {}", status, body)),
        }
    }

    fn map_request_error(e: reqwest::Error, elapsed: Duration) -> CompletionError {
        if e.is_timeout() {
            CompletionError::timeout(elapsed)
        } else if e.is_connect() {
            CompletionError::network(format!("connection failed: {}", e))
        } else {
            CompletionError::network(format!("request failed: {}", e))
        }
    }
}

/// Try to parse retry-after from an error body
///
/// Negative, non-finite or out-of-range values are ignored.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    json.get("retry_after")
        .and_then(|v| v.as_f64())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[async_trait]
impl CompletionService for HttpCompletion {
    async fn complete(&self, prompt: &str, model: &str) -> Result<Completion, CompletionError> {
        let start = Instant::now();

        let body = ChatCompletionRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            stream: true,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(self.chat_completion_url()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        tracing::debug!(model, prompt_len = prompt.len(), "Sending completion request");

        let mut response = request
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, start.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_http_error(status, &body));
        }

        let mut buffer = SseBuffer::default();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_request_error(e, start.elapsed()))?
        {
            buffer.push(&chunk);
            if buffer.is_done() {
                break;
            }
        }

        let text = buffer.finish()?;
        let duration = start.elapsed();
        tracing::debug!(model, chars = text.chars().count(), ?duration, "Completion received");

        Ok(Completion::new(text, model, duration))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Accumulates an SSE response body into the answer text
#[derive(Debug, Default)]
struct SseBuffer {
    /// Bytes of an incomplete trailing line
    pending: Vec<u8>,

    /// Entire body, kept for the non-streaming fallback
    raw: Vec<u8>,

    text: String,
    data_lines: usize,
    done: bool,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.raw.extend_from_slice(bytes);
        self.pending.extend_from_slice(bytes);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&String::from_utf8_lossy(&line));
            if self.done {
                self.pending.clear();
                return;
            }
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn handle_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.trim();
        self.data_lines += 1;

        if payload == "[DONE]" {
            self.done = true;
            return;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(event) => {
                if let Some(delta) = event
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                {
                    self.text.push_str(delta);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, payload, "Skipping malformed stream chunk");
            }
        }
    }

    /// Flush the last line and produce the answer
    fn finish(mut self) -> Result<String, CompletionError> {
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.handle_line(&String::from_utf8_lossy(&line));
        }

        if self.data_lines > 0 {
            return Ok(self.text);
        }

        let raw = String::from_utf8_lossy(&self.raw);
        if raw.trim().is_empty() {
            return Err(CompletionError::EmptyBody);
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&raw)
            .map_err(|e| CompletionError::parse(format!("failed to parse response: {}", e)))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
