use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Error as JsonError;

#[derive(Debug)]
pub enum CompletionApiError {
    ClientBuild(reqwest::Error),
    InvalidHeader(String),
    /// Non-success HTTP status. `status_text` mirrors the response reason phrase.
    RequestFailed {
        status: StatusCode,
        status_text: String,
        detail: String,
    },
    Transport(reqwest::Error),
    Decode(JsonError),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayload {
    #[serde(rename = "error")]
    pub value: Option<ErrorPayloadValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorPayloadValue {
    Fields(ErrorPayloadFields),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
    pub code: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

impl ErrorPayloadFields {
    fn message_or_fallback(&self) -> Option<String> {
        if let Some(message) = self.message.as_deref().and_then(non_empty_string) {
            return Some(message.to_owned());
        }

        let code = self.code.as_ref().map(|code| match code {
            serde_json::Value::String(value) => value.clone(),
            other => other.to_string(),
        });
        code.as_deref()
            .and_then(non_empty_string)
            .or_else(|| self.type_.as_deref().and_then(non_empty_string))
            .map(str::to_owned)
    }
}

impl fmt::Display for CompletionApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientBuild(error) => write!(f, "failed to build HTTP client: {error}"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::RequestFailed { status_text, .. } => {
                write!(f, "API request failed: {status_text}")
            }
            Self::Transport(error) => write!(f, "network error: {error}"),
            Self::Decode(error) => write!(f, "invalid response body: {error}"),
        }
    }
}

impl std::error::Error for CompletionApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ClientBuild(error) | Self::Transport(error) => Some(error),
            Self::Decode(error) => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CompletionApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error)
    }
}

impl From<JsonError> for CompletionApiError {
    fn from(error: JsonError) -> Self {
        Self::Decode(error)
    }
}

/// Reason phrase reported for a status, falling back to the numeric code.
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.as_u16().to_string())
}

/// Extracts a human-readable message from a provider error body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let parsed = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(payload) => payload,
        Err(_) => {
            return if body.trim().is_empty() {
                status_text(status)
            } else {
                body.to_string()
            };
        }
    };

    match parsed.value {
        Some(ErrorPayloadValue::Fields(fields)) => {
            if let Some(message) = fields.message_or_fallback() {
                return message;
            }
        }
        Some(ErrorPayloadValue::Text(text)) if !text.is_empty() => return text,
        _ => {}
    }

    if body.trim().is_empty() {
        status_text(status)
    } else {
        body.to_string()
    }
}

fn non_empty_string(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
