//! Terminal coding assistant: chat and image-to-code over a completion API.
//!
//! ## Provider bootstrap
//!
//! - `CODE_ASSISTANT_PROVIDER=http` (default) posts to `CODE_ASSISTANT_ENDPOINT`,
//!   which defaults to a local `completion-relay` at
//!   `http://127.0.0.1:8787/v1/chat/completions`. The relay holds the provider
//!   credential; the client sends a bearer token only when
//!   `CODE_ASSISTANT_API_KEY` is set.
//! - `CODE_ASSISTANT_PROVIDER=mock` answers locally with canned replies.
//!
//! `CODE_ASSISTANT_CONFIG_PATH` may name a UTF-8 JSON file with this shape:
//!
//! ```json
//! {
//!   "endpoint": "http://127.0.0.1:8787/v1",
//!   "model": "blackboxai/openai/gpt-4",
//!   "admission": "serialized",
//!   "timeout_sec": 120,
//!   "chat": { "temperature": 0.5, "max_tokens": 1024 },
//!   "image": { "temperature": 0.3, "max_tokens": 1500 }
//! }
//! ```
//!
//! Every field is optional, `timeout_sec` must be > 0, and unknown fields are
//! rejected. Environment variables override file values.
//!
//! ## Session contract
//!
//! `App` owns the conversation (system message first, append-only), the code
//! pane, and both flow states. Completions run on worker threads owned by
//! `RuntimeController`; their results are applied to `App` only when the view
//! flushes the event queue.

pub mod app;
pub mod client;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod extract;
pub mod flow;
pub mod image;
pub mod logging;
pub mod providers;
pub mod runtime;
pub mod view;
