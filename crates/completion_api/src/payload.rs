use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{role, content}` entry of the `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Request body for the chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Default: false. The transport always sends false.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    pub fn new(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            max_tokens,
            stream: false,
        }
    }
}

/// Decoded success response: its status and raw JSON body.
///
/// The body is kept as raw JSON: a body that parses but lacks
/// `choices[0].message.content` is an empty reply, not a decode failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ChatCompletionResponse {
    /// Wraps an already-decoded body answered with `200 OK`.
    pub fn new(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self::new)
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns `choices[0].message.content` when it is a non-empty string.
    pub fn first_content(&self) -> Option<&str> {
        self.body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|content| !content.is_empty())
    }

    /// Returns `usage.total_tokens` when the provider reports it.
    pub fn total_tokens(&self) -> Option<u64> {
        self.body
            .pointer("/usage/total_tokens")
            .and_then(Value::as_u64)
    }
}
