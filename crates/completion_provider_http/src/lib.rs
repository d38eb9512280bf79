//! HTTP-backed implementation of the shared `completion_provider` contract.
//!
//! This adapter translates `CompletionRequest`s into `completion_api` payloads,
//! drives one single-shot POST per request, and maps transport outcomes onto
//! the provider-neutral `CompletionReply`/`CompletionError` taxonomy.

use std::sync::Arc;
use std::time::Duration;

use completion_api::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionApiClient,
    CompletionApiConfig, CompletionApiError,
};
use completion_provider::{
    CompletionError, CompletionProvider, CompletionReply, CompletionRequest, ProviderInitError,
    ProviderProfile,
};

/// Stable provider identifier used for startup selection.
pub const HTTP_PROVIDER_ID: &str = "http";

/// Runtime configuration for the HTTP provider.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpProviderConfig {
    pub endpoint: String,
    pub model_id: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpProviderConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model_id: model_id.into(),
            api_key: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_api_config(self) -> CompletionApiConfig {
        let mut config = CompletionApiConfig::new(self.endpoint);

        if let Some(api_key) = self.api_key {
            config = config.with_api_key(api_key);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait CompletionTransport: Send + Sync {
    fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionError>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: CompletionApiClient,
}

impl CompletionTransport for DefaultTransport {
    fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                CompletionError::Transport(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime
            .block_on(self.client.complete(request))
            .map_err(map_api_error)
    }
}

/// `CompletionProvider` adapter backed by `completion_api` transport primitives.
pub struct HttpCompletionProvider {
    endpoint: String,
    model_id: String,
    transport: Arc<dyn CompletionTransport>,
}

impl HttpCompletionProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderInitError> {
        let model_id = config.model_id.trim().to_string();
        if model_id.is_empty() {
            return Err(ProviderInitError::new("http provider requires a model id"));
        }

        let client = CompletionApiClient::new(config.into_api_config()).map_err(map_init_error)?;
        let endpoint = client.normalized_endpoint();

        Ok(Self {
            endpoint,
            model_id,
            transport: Arc::new(DefaultTransport { client }),
        })
    }

    /// Normalized endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[cfg(test)]
    fn with_transport_for_tests(model_id: &str, transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            endpoint: "test://completions".to_string(),
            model_id: model_id.to_string(),
            transport,
        }
    }
}

impl CompletionProvider for HttpCompletionProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: HTTP_PROVIDER_ID.to_string(),
            model_id: self.model_id.clone(),
        }
    }

    fn complete(&self, request: &CompletionRequest) -> Result<CompletionReply, CompletionError> {
        let payload = to_chat_completion_request(request);
        tracing::debug!(
            request_id = request.request_id,
            endpoint = %self.endpoint,
            "dispatching completion request"
        );

        let response = self.transport.complete(&payload)?;

        Ok(CompletionReply::from_content(response.first_content()))
    }
}

fn to_chat_completion_request(request: &CompletionRequest) -> ChatCompletionRequest {
    let messages = request
        .messages
        .iter()
        .map(|message| ChatMessage::new(message.role.as_str(), message.content.clone()))
        .collect();

    ChatCompletionRequest::new(
        request.options.model.clone(),
        messages,
        request.options.temperature,
        request.options.max_tokens,
    )
}

fn map_api_error(error: CompletionApiError) -> CompletionError {
    match error {
        CompletionApiError::RequestFailed {
            status,
            status_text,
            detail,
        } => {
            tracing::warn!(status = status.as_u16(), %detail, "provider rejected completion");
            CompletionError::RequestFailed {
                status: status.as_u16(),
                status_text,
            }
        }
        CompletionApiError::Decode(error) => CompletionError::Decode(error.to_string()),
        other => CompletionError::Transport(other.to_string()),
    }
}

fn map_init_error(error: CompletionApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize http provider: {error}"))
}
