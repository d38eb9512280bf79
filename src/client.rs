//! Session-facing completion client.
//!
//! Wraps any [`CompletionProvider`] with the per-flow generation settings and
//! the fallback literals used when a provider returns no content.

use std::sync::Arc;

use completion_provider::{
    CompletionError, CompletionOptions, CompletionProvider, CompletionRequest, Message,
    ProviderProfile, RequestId,
};

use crate::conversation::Conversation;
use crate::image::{image_prompt, ImageUpload};

pub const DEFAULT_MODEL: &str = "blackboxai/openai/gpt-4";
pub const CHAT_FALLBACK: &str = "No response";
pub const IMAGE_FALLBACK: &str = "No result";

/// Sampling knobs for one flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub const CHAT: Self = Self {
        temperature: 0.5,
        max_tokens: 1024,
    };

    pub const IMAGE: Self = Self {
        temperature: 0.3,
        max_tokens: 1500,
    };
}

pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
    chat: CompletionOptions,
    image: CompletionOptions,
}

impl CompletionClient {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: &str,
        chat: GenerationSettings,
        image: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            chat: CompletionOptions::new(model, chat.temperature, chat.max_tokens),
            image: CompletionOptions::new(model, image.temperature, image.max_tokens),
        }
    }

    /// Client with the stock model and settings.
    pub fn with_defaults(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::new(
            provider,
            DEFAULT_MODEL,
            GenerationSettings::CHAT,
            GenerationSettings::IMAGE,
        )
    }

    pub fn profile(&self) -> ProviderProfile {
        self.provider.profile()
    }

    /// Sends the whole history, system message first.
    pub fn complete(
        &self,
        request_id: RequestId,
        history: &Conversation,
    ) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            request_id,
            messages: history.messages().to_vec(),
            options: self.chat.clone(),
        };

        let reply = self.provider.complete(&request)?;
        Ok(reply.into_text_or(CHAT_FALLBACK))
    }

    /// Sends exactly one user message carrying the encoded image. No history.
    pub fn complete_image(
        &self,
        request_id: RequestId,
        upload: &ImageUpload,
    ) -> Result<String, CompletionError> {
        tracing::debug!(
            request_id,
            file = %upload.file_name,
            mime = %upload.mime,
            bytes = upload.size(),
            "building image prompt"
        );
        let request = CompletionRequest {
            request_id,
            messages: vec![Message::user(image_prompt(upload))],
            options: self.image.clone(),
        };

        let reply = self.provider.complete(&request)?;
        Ok(reply.into_text_or(IMAGE_FALLBACK))
    }
}
