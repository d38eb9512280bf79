use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use completion_api::CompletionApiError;
use thiserror::Error;

/// Failure surfaced to relay clients.
///
/// Every variant renders as `{"error":{"message": ...}}` so clients parse
/// relay and provider failures the same way.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upstream answered with a non-success status; relayed as-is.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream unavailable: {0}")]
    BadGateway(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let code = self.status();
        let body = Json(serde_json::json!({ "error": { "message": self.to_string() } }));
        (code, body).into_response()
    }
}

impl From<CompletionApiError> for RelayError {
    fn from(e: CompletionApiError) -> Self {
        match e {
            CompletionApiError::RequestFailed { status, detail, .. } => RelayError::Upstream {
                status,
                message: detail,
            },
            CompletionApiError::Decode(error) => {
                RelayError::BadGateway(format!("upstream returned a non-JSON body: {error}"))
            }
            other => RelayError::BadGateway(other.to_string()),
        }
    }
}
