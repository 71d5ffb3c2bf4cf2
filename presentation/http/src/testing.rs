//! Test doubles and request helpers

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use relay_core::prelude::*;
use std::sync::Mutex;
use std::time::Duration;

/// A call observed by [`MockProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Text(String),
    Chat {
        context: Vec<ChatMessage>,
        message: String,
    },
}

/// Provider that records calls and returns a canned outcome
pub struct MockProvider {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            reply: Err(detail.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: ProviderCall) -> ProviderResult<String> {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(ProviderError::NetworkError)
    }
}

#[async_trait]
impl TextProvider for MockProvider {
    async fn generate_text(&self, prompt: &Prompt) -> ProviderResult<String> {
        self.respond(ProviderCall::Text(prompt.to_string())).await
    }

    async fn generate_chat(
        &self,
        context: &[ChatMessage],
        message: &str,
    ) -> ProviderResult<String> {
        self.respond(ProviderCall::Chat {
            context: context.to_vec(),
            message: message.to_string(),
        })
        .await
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    post_raw(uri, "application/json", &body.to_string())
}

pub fn post_raw(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
