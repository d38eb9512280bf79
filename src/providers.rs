use std::sync::Arc;
use std::time::Duration;

use completion_provider::{CompletionProvider, ProviderInitError};
use completion_provider_http::{HttpCompletionProvider, HttpProviderConfig, HTTP_PROVIDER_ID};
use completion_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::AssistantConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Http,
    Mock,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            HTTP_PROVIDER_ID => Some(Self::Http),
            MOCK_PROVIDER_ID => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => HTTP_PROVIDER_ID,
            Self::Mock => MOCK_PROVIDER_ID,
        }
    }
}

const MOCK_LOCAL_DELAY: Duration = Duration::from_millis(300);

pub fn provider_for_config(
    config: &AssistantConfig,
) -> Result<Arc<dyn CompletionProvider>, ProviderInitError> {
    match config.provider {
        ProviderKind::Http => {
            let mut http = HttpProviderConfig::new(&config.endpoint, &config.model);
            if let Some(api_key) = config.api_key.as_deref() {
                http = http.with_api_key(api_key);
            }
            if let Some(timeout) = config.timeout {
                http = http.with_timeout(timeout);
            }

            let provider = HttpCompletionProvider::new(http)?;
            tracing::info!(endpoint = provider.endpoint(), "using http completion provider");
            Ok(Arc::new(provider))
        }
        ProviderKind::Mock => Ok(Arc::new(
            MockProvider::new(Vec::new())
                .with_model_id(&config.model)
                .with_delay(MOCK_LOCAL_DELAY),
        )),
    }
}
