//! Minimal provider-agnostic contract for issuing one chat completion.
//!
//! This crate defines the message model, the per-request knobs, and the
//! completion capability that the session core depends on. It excludes
//! transport details, credentials, and wire payloads: a provider may call a
//! trusted relay, a hosted endpoint, or nothing at all.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for one completion request.
pub type RequestId = u64;

/// Error returned while constructing/configuring a provider before any request starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Conversation role tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message, immutable once it enters a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Generation knobs carried by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Always false: completions are single-shot request/response.
    #[serde(default)]
    pub stream: bool,
}

impl CompletionOptions {
    #[must_use]
    pub fn new(model: impl Into<String>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
            stream: false,
        }
    }
}

/// Input required to issue one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub request_id: RequestId,
    pub messages: Vec<Message>,
    pub options: CompletionOptions,
}

/// Textual result of a completion.
///
/// A provider response without usable content is not an error; callers pick
/// their own fallback literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReply {
    Text(String),
    Empty,
}

impl CompletionReply {
    /// Builds a reply from optional provider content, treating blank content as empty.
    #[must_use]
    pub fn from_content(content: Option<&str>) -> Self {
        match content {
            Some(text) if !text.is_empty() => Self::Text(text.to_string()),
            _ => Self::Empty,
        }
    }

    #[must_use]
    pub fn into_text_or(self, fallback: &str) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty => fallback.to_string(),
        }
    }
}

/// Failure of a single completion request. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("API request failed: {status_text}")]
    RequestFailed { status: u16, status_text: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Immutable metadata describing a completion provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// The "issue completion" capability the session core is built against.
///
/// Implementations block the calling thread until the request resolves or
/// fails. Callers run them off the view thread.
pub trait CompletionProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Issues one completion request and waits for the full reply.
    fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, CompletionError>;
}
