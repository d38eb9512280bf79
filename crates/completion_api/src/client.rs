use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::config::CompletionApiConfig;
use crate::error::{parse_error_message, status_text, CompletionApiError};
use crate::headers::build_headers;
use crate::payload::{ChatCompletionRequest, ChatCompletionResponse};
use crate::url::normalize_completions_url;

#[derive(Debug)]
pub struct CompletionApiClient {
    http: Client,
    config: CompletionApiConfig,
}

impl CompletionApiClient {
    pub fn new(config: CompletionApiConfig) -> Result<Self, CompletionApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(CompletionApiError::ClientBuild)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionApiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(&self, user_agent: Option<&str>) -> Result<HeaderMap, CompletionApiError> {
        let headers = build_headers(&self.config, user_agent);
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| CompletionApiError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    CompletionApiError::InvalidHeader(format!("invalid value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, CompletionApiError> {
        let headers = self.build_headers(self.config.user_agent.as_deref())?;
        let payload = request_with_transport_defaults(request);
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Sends one request and decodes the full JSON body.
    ///
    /// Non-success statuses fail with [`CompletionApiError::RequestFailed`]
    /// before the body is decoded.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionApiError> {
        tracing::debug!(
            endpoint = %self.normalized_endpoint(),
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion"
        );

        let response = self.build_request(request)?.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = parse_error_message(status, &body);
            tracing::warn!(status = status.as_u16(), %detail, "chat completion rejected");
            return Err(CompletionApiError::RequestFailed {
                status,
                status_text: status_text(status),
                detail,
            });
        }

        let bytes = response.bytes().await?;
        let decoded = ChatCompletionResponse::from_slice(&bytes)?.with_status(status);
        tracing::debug!(
            status = status.as_u16(),
            total_tokens = decoded.total_tokens(),
            has_content = decoded.first_content().is_some(),
            "chat completion resolved"
        );
        Ok(decoded)
    }
}

fn request_with_transport_defaults(request: &ChatCompletionRequest) -> ChatCompletionRequest {
    let mut payload = request.clone();
    payload.stream = false;
    payload
}
