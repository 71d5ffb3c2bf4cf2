//! Request and response types for the relay endpoints

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/generate-text`
///
/// Fields are optional at the wire level so that a missing field reaches
/// validation instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateTextRequest {
    /// Prompt to send to the provider
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Body of `POST /api/generate-chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateChatRequest {
    /// Full conversation so far; the last entry is the new user turn
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
}

/// Author of a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry of a chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced this turn
    pub role: Role,
    /// Message parts; only text parts are supported
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

/// Text fragment of a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub text: String,
}

impl ChatMessage {
    /// Create a user message with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart { text: text.into() }],
        }
    }

    /// Create a model message with a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![MessagePart { text: text.into() }],
        }
    }

    /// Text of the first part, if any
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

/// Successful response body shared by both endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
}

/// Failure response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// A prompt that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub(crate) fn new_unchecked(prompt: String) -> Self {
        Self(prompt)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chat history split into seeded context and the new user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    /// Every history entry except the last
    pub context: Vec<ChatMessage>,
    /// First text part of the last history entry
    pub message: String,
}
