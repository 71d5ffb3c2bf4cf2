//! Gemini connector for relay text generation

use relay_core::prelude::*;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod config;
mod models;

pub use config::{GeminiConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use models::*;

/// Header carrying the API key; keeps the key out of request URLs and logs
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini implementation of TextProvider
pub struct GeminiConnector {
    client: Client,
    config: GeminiConfig,
}

impl GeminiConnector {
    /// Create a new Gemini connector
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::ConfigError("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                ProviderError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Get the generateContent URL for the configured model
    fn get_api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.config.temperature.is_none() && self.config.max_output_tokens.is_none() {
            return None;
        }

        Some(GenerationConfig {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        })
    }

    /// Post the contents to generateContent and pull the text out of the reply
    async fn generate(&self, contents: Vec<Content>) -> ProviderResult<String> {
        let request = ContentRequest {
            contents,
            generation_config: self.generation_config(),
        };

        let response = self
            .client
            .post(self.get_api_url())
            .header(API_KEY_HEADER, self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::NetworkError(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let content_response: ContentResponse = response
            .json()
            .await
            .map_err(|e| {
                ProviderError::ResponseParseError(format!("Failed to parse response: {}", e))
            })?;

        if let Some(usage) = &content_response.usage_metadata {
            debug!(
                "Gemini usage: {} prompt, {} candidate, {} total tokens",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        extract_text(content_response)
    }
}

/// Build an API error from a non-2xx reply, preferring Gemini's error envelope
fn api_error(status: u16, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<GeminiError>(body) {
        Ok(GeminiError { error }) => {
            format!("{} ({}): {}", error.status, error.code, error.message)
        }
        Err(_) if body.is_empty() => "Unknown error".to_string(),
        Err(_) => body.to_string(),
    };

    ProviderError::ApiError { status, message }
}

/// Take the first candidate's text, mapping blocked or empty replies to errors
fn extract_text(response: ContentResponse) -> ProviderResult<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        warn!("Gemini blocked the prompt: {}", reason);
        return Err(ProviderError::Blocked(reason.to_string()));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or(ProviderError::EmptyResponse)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            warn!("Gemini withheld the candidate: {}", reason);
            return Err(ProviderError::Blocked(reason.to_string()));
        }
    }

    let text = candidate.text();
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(text)
}

#[async_trait]
impl TextProvider for GeminiConnector {
    async fn generate_text(&self, prompt: &Prompt) -> ProviderResult<String> {
        debug!("Starting Gemini generation with model {}", self.config.model);
        let start_time = Instant::now();

        let text = self.generate(vec![Content::new_user(prompt.as_str())]).await?;

        info!(
            "Gemini generation finished in {}ms ({} chars)",
            start_time.elapsed().as_millis(),
            text.len()
        );
        Ok(text)
    }

    async fn generate_chat(
        &self,
        context: &[ChatMessage],
        message: &str,
    ) -> ProviderResult<String> {
        debug!(
            "Starting Gemini chat with model {} over {} prior turns",
            self.config.model,
            context.len()
        );
        let start_time = Instant::now();

        let mut contents: Vec<Content> = context.iter().map(Content::from).collect();
        contents.push(Content::new_user(message));

        let text = self.generate(contents).await?;

        info!(
            "Gemini chat finished in {}ms ({} chars)",
            start_time.elapsed().as_millis(),
            text.len()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-2.0-flash:generateContent";

    fn connector(server: &MockServer) -> GeminiConnector {
        let config = GeminiConfig::new("test-key").with_api_base(server.uri());
        GeminiConnector::new(config).unwrap()
    }

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 3,
                "candidatesTokenCount": 5,
                "totalTokenCount": 8
            }
        })
    }

    fn prompt(text: &str) -> Prompt {
        validate_prompt(Some(text.to_string())).unwrap()
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GeminiConnector::new(GeminiConfig::new("")),
            Err(ProviderError::ConfigError(_))
        ));
    }

    #[test]
    fn test_api_url() {
        let config = GeminiConfig::new("k").with_api_base("https://example.test/v1beta/");
        let connector = GeminiConnector::new(config).unwrap();
        assert_eq!(
            connector.get_api_url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "Describe a chair"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("A sturdy chair.")))
            .expect(1)
            .mount(&server)
            .await;

        let text = connector(&server)
            .generate_text(&prompt("Describe a chair"))
            .await
            .unwrap();
        assert_eq!(text, "A sturdy chair.");
    }

    #[tokio::test]
    async fn test_generate_chat_sends_context_then_new_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello"}]},
                    {"role": "user", "parts": [{"text": "How are you?"}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Fine.")))
            .expect(1)
            .mount(&server)
            .await;

        let context = vec![ChatMessage::user("Hi"), ChatMessage::model("Hello")];
        let text = connector(&server)
            .generate_chat(&context, "How are you?")
            .await
            .unwrap();
        assert_eq!(text, "Fine.");
    }

    #[tokio::test]
    async fn test_multiple_parts_are_concatenated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]
            })))
            .mount(&server)
            .await;

        let text = connector(&server).generate_text(&prompt("x")).await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_api_error_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = connector(&server).generate_text(&prompt("x")).await.unwrap_err();
        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("Quota exceeded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = connector(&server).generate_text(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Blocked(reason) if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn test_withheld_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "RECITATION"}]
            })))
            .mount(&server)
            .await;

        let err = connector(&server).generate_text(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = connector(&server).generate_text(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = connector(&server).generate_text(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::ResponseParseError(_)));
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("late"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = GeminiConfig::new("test-key")
            .with_api_base(server.uri())
            .with_timeout(50);
        let connector = GeminiConnector::new(config).unwrap();

        let err = connector.generate_text(&prompt("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }

    #[tokio::test]
    async fn test_generation_config_only_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "generationConfig": {"temperature": 0.5, "maxOutputTokens": 64}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let config = GeminiConfig::new("test-key")
            .with_api_base(server.uri())
            .with_temperature(0.5)
            .with_max_output_tokens(64);
        let connector = GeminiConnector::new(config).unwrap();
        assert_eq!(connector.generate_text(&prompt("x")).await.unwrap(), "ok");

        let plain = GeminiConnector::new(GeminiConfig::new("k")).unwrap();
        assert!(plain.generation_config().is_none());
    }
}
