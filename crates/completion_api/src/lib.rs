//! Transport-only chat-completions client primitives.
//!
//! This crate owns request building, header construction, and response
//! parsing for an OpenAI-style `chat/completions` endpoint. It contains no
//! conversation state and no UI coupling, and it never stores credentials
//! beyond the lifetime of its [`CompletionApiConfig`].
//!
//! Requests are single-shot: `stream` is always sent as `false` and the full
//! JSON body is awaited. There are no retries.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::CompletionApiClient;
pub use config::CompletionApiConfig;
pub use error::CompletionApiError;
pub use payload::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
pub use url::normalize_completions_url;

pub use reqwest::StatusCode;
