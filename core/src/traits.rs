//! Provider trait implemented by generative text connectors

use crate::errors::ProviderResult;
use crate::types::{ChatMessage, Prompt};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for generative text providers
///
/// Implementations are shared across concurrent requests and must not keep
/// per-request state.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Single-turn generation from one prompt
    async fn generate_text(&self, prompt: &Prompt) -> ProviderResult<String>;

    /// Send `message` as a new user turn on top of `context`
    async fn generate_chat(
        &self,
        context: &[ChatMessage],
        message: &str,
    ) -> ProviderResult<String>;

    /// Provider name for logs and health output
    fn name(&self) -> &str;

    /// Model identifier every call is made against
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: TextProvider + ?Sized> TextProvider for Arc<T> {
    async fn generate_text(&self, prompt: &Prompt) -> ProviderResult<String> {
        (**self).generate_text(prompt).await
    }

    async fn generate_chat(
        &self,
        context: &[ChatMessage],
        message: &str,
    ) -> ProviderResult<String> {
        (**self).generate_chat(context, message).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}
