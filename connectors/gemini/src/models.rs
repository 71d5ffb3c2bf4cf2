//! Gemini API data models

use relay_core::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Content part of a request
#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String, // "user" or "model"
    pub parts: Vec<Part>,
}

/// Part of a content
#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

/// Generation configuration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Gemini `generateContent` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Candidate in the response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ContentResult>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Content in the response
#[derive(Debug, Deserialize)]
pub struct ContentResult {
    #[serde(default)]
    pub parts: Vec<PartResult>,
}

/// Part in the response; non-text parts carry no `text`
#[derive(Debug, Deserialize)]
pub struct PartResult {
    #[serde(default)]
    pub text: Option<String>,
}

/// Feedback about the prompt (set when it was blocked)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Usage metadata
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

/// Gemini error response
#[derive(Debug, Deserialize)]
pub struct GeminiError {
    pub error: ErrorDetails,
}

/// Error details
#[derive(Debug, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Finish reasons that mean the candidate was withheld
pub const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

impl Content {
    /// Create a new user content
    pub fn new_user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

impl From<&ChatMessage> for Content {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            parts: message
                .parts
                .iter()
                .map(|p| Part {
                    text: p.text.clone(),
                })
                .collect(),
        }
    }
}

impl Candidate {
    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| &c.parts)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}
