use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use completion_api::{ChatCompletionRequest, ChatMessage};
use serde::Deserialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::upstream::Upstream;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Chat-completions endpoint path.
pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

const ALLOWED_ROLES: [&str; 3] = ["system", "user", "assistant"];

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
    /// When set, overrides whatever model the client asked for.
    pub model: Option<String>,
}

/// Build every relay route.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(COMPLETIONS_PATH, post(chat_completions))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct RelayRequest {
    #[serde(default)]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    #[serde(default)]
    stream: bool,
}

async fn chat_completions(
    State(st): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), RelayError> {
    let request = parse_request(&body, st.model.as_deref())?;
    tracing::info!(
        model = %request.model,
        messages = request.messages.len(),
        max_tokens = request.max_tokens,
        "relaying chat completion"
    );

    match st.upstream.forward(request).await {
        Ok(response) => Ok((response.status, Json(response.body))),
        Err(error) => {
            let error = RelayError::from(error);
            tracing::warn!(status = error.status().as_u16(), %error, "relay request failed");
            Err(error)
        }
    }
}

fn parse_request(body: &[u8], pinned_model: Option<&str>) -> Result<ChatCompletionRequest, RelayError> {
    let parsed: RelayRequest = serde_json::from_slice(body)
        .map_err(|e| RelayError::BadRequest(format!("invalid request body: {e}")))?;

    if parsed.messages.is_empty() {
        return Err(RelayError::BadRequest("messages must not be empty".to_string()));
    }
    if let Some(message) = parsed
        .messages
        .iter()
        .find(|message| !ALLOWED_ROLES.contains(&message.role.as_str()))
    {
        return Err(RelayError::BadRequest(format!(
            "unsupported role: {}",
            message.role
        )));
    }
    if parsed.stream {
        tracing::debug!("client asked for streaming; relaying single-shot instead");
    }

    let model = match pinned_model {
        Some(model) => model.to_string(),
        None => parsed
            .model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| RelayError::BadRequest("model is required".to_string()))?,
    };

    Ok(ChatCompletionRequest::new(
        model,
        parsed.messages,
        parsed.temperature,
        parsed.max_tokens,
    ))
}

#[cfg(test)]
mod tests {
    use super::parse_request;
    use crate::error::RelayError;

    #[test]
    fn pinned_model_overrides_client_choice() {
        let body = br#"{"model":"client-pick","messages":[{"role":"user","content":"hi"}],"temperature":0.5,"max_tokens":16,"stream":true}"#;

        let request = parse_request(body, Some("pinned")).expect("valid request");

        assert_eq!(request.model, "pinned");
        assert!(!request.stream);
    }

    #[test]
    fn missing_model_without_pin_is_rejected() {
        let body = br#"{"messages":[{"role":"user","content":"hi"}],"temperature":0.5,"max_tokens":16}"#;

        assert!(matches!(
            parse_request(body, None),
            Err(RelayError::BadRequest(message)) if message == "model is required"
        ));
    }

    #[test]
    fn unknown_roles_are_rejected() {
        let body = br#"{"model":"m","messages":[{"role":"tool","content":"x"}],"temperature":0.5,"max_tokens":16}"#;

        assert!(matches!(
            parse_request(body, None),
            Err(RelayError::BadRequest(message)) if message == "unsupported role: tool"
        ));
    }
}
