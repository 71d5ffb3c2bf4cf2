//! Error types for relay operations

use thiserror::Error;

/// Main error type at the handler boundary
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// A required request field was missing or unusable.
///
/// The display text is the message returned to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Prompt is required.")]
    MissingPrompt,

    #[error("Conversation history is required.")]
    MissingHistory,

    #[error("Last history entry must contain text.")]
    EmptyLastMessage,

    #[error("Prompt must be a string.")]
    InvalidPrompt,

    #[error("History entries must have a role of \"user\" or \"model\" and text parts.")]
    InvalidHistory,
}

/// Errors from a generative text provider call
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error from provider (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Timeout during provider call")]
    Timeout,

    #[error("Prompt blocked by provider: {0}")]
    Blocked(String),

    #[error("Failed to parse provider response: {0}")]
    ResponseParseError(String),

    #[error("Provider returned no text")]
    EmptyResponse,
}

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
