//! Wire-level types for the OpenAI-compatible streaming completions contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A message in a chat-style conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Which of the two completion endpoints a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ChatCompletions,
    TextCompletions,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::ChatCompletions => "/v1/chat/completions",
            Self::TextCompletions => "/v1/completions",
        }
    }

    /// The `extra_query` key that overrides this endpoint's query string,
    /// per the spec's Open Question 3 resolution.
    pub fn extra_query_key(&self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat_completions",
            Self::TextCompletions => "text_completions",
        }
    }
}

/// One completion request as the backend client sees it: either a chat
/// payload (`messages`) or a text payload (`prompt`), never both.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub model: String,
    pub messages: Option<Vec<Message>>,
    pub prompt: Option<String>,
    /// Request-level cap. Unlike the instance-level `max_output_tokens`,
    /// setting this also forces `stop: null` and `ignore_eos: true` so the
    /// server is not allowed to stop early for any reason but the cap.
    pub max_output_tokens: Option<u32>,
    pub prompt_tokens_hint: Option<u64>,
    pub output_tokens_hint: Option<u64>,
}

impl BackendRequest {
    pub fn endpoint(&self) -> Endpoint {
        if self.messages.is_some() {
            Endpoint::ChatCompletions
        } else {
            Endpoint::TextCompletions
        }
    }

    pub fn chat(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages: Some(messages),
            prompt: None,
            max_output_tokens: None,
            prompt_tokens_hint: None,
            output_tokens_hint: None,
        }
    }

    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: None,
            prompt: Some(prompt.into()),
            max_output_tokens: None,
            prompt_tokens_hint: None,
            output_tokens_hint: None,
        }
    }
}

/// Connection-wide configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub target: String,
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub http2: bool,
    pub follow_redirects: bool,
    /// Instance-level cap: only a ceiling, does not force `ignore_eos`.
    pub max_output_tokens: Option<u32>,
    pub extra_query: HashMap<String, HashMap<String, String>>,
    pub extra_body: serde_json::Map<String, serde_json::Value>,
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            target: "http://localhost:8000".to_string(),
            api_key: None,
            organization: None,
            project: None,
            http2: false,
            follow_redirects: true,
            max_output_tokens: None,
            extra_query: HashMap::new(),
            extra_body: serde_json::Map::new(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Aggregate token usage reported by the server at stream end.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageTotals {
    pub prompt_tokens: Option<u64>,
    pub output_tokens: u64,
}

/// One event out of the Backend Client's stream.
#[derive(Debug, Clone)]
pub enum StreamingEvent {
    Start,
    Iter { delta: String },
    Final { usage: UsageTotals },
}
