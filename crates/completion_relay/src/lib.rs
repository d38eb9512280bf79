//! Trusted relay for chat completions.
//!
//! Clients post the OpenAI-style body without credentials; the relay checks
//! its shape, optionally pins the model, and forwards it upstream with a
//! bearer key that only this process knows.

pub mod error;
pub mod http;
pub mod upstream;

pub use error::RelayError;
pub use http::{router, AppState};
pub use upstream::{ApiUpstream, Upstream, UpstreamConfig};
