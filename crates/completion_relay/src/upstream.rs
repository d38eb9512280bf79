use std::time::Duration;

use async_trait::async_trait;
use completion_api::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionApiClient, CompletionApiConfig,
    CompletionApiError,
};

/// Where validated requests are forwarded.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionApiError>;
}

/// Upstream connection settings. The key never leaves this process.
#[derive(Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub api_key: String,
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Forwards through `completion_api` with the server-held bearer key.
#[derive(Debug)]
pub struct ApiUpstream {
    client: CompletionApiClient,
}

impl ApiUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self, CompletionApiError> {
        let mut api = CompletionApiConfig::new(config.url)
            .with_api_key(config.api_key)
            .with_user_agent(concat!("completion-relay/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            api = api.with_timeout(timeout);
        }

        Ok(Self {
            client: CompletionApiClient::new(api)?,
        })
    }

    pub fn endpoint(&self) -> String {
        self.client.normalized_endpoint()
    }
}

#[async_trait]
impl Upstream for ApiUpstream {
    async fn forward(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CompletionApiError> {
        self.client.complete(&request).await
    }
}
