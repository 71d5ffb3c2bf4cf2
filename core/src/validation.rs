//! Presence checks for request bodies
//!
//! Both functions run before any provider call; a failure here means the
//! provider is never invoked.

use crate::errors::ValidationError;
use crate::types::{ChatMessage, ChatTurn, Prompt};
use tracing::debug;

/// Require a present, non-empty prompt.
///
/// Whitespace-only prompts are accepted and forwarded as-is.
pub fn validate_prompt(prompt: Option<String>) -> Result<Prompt, ValidationError> {
    match prompt {
        Some(prompt) if !prompt.is_empty() => Ok(Prompt::new_unchecked(prompt)),
        _ => {
            debug!("Rejecting generate-text request without prompt");
            Err(ValidationError::MissingPrompt)
        }
    }
}

/// Split a history into prior context and the new user turn.
///
/// The last entry must carry a non-empty first text part.
pub fn split_history(history: Option<Vec<ChatMessage>>) -> Result<ChatTurn, ValidationError> {
    let mut context = match history {
        Some(history) if !history.is_empty() => history,
        _ => {
            debug!("Rejecting generate-chat request without history");
            return Err(ValidationError::MissingHistory);
        }
    };

    let last = context.pop().ok_or(ValidationError::MissingHistory)?;
    let message = match last.first_text() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            debug!("Rejecting generate-chat request whose last entry has no text");
            return Err(ValidationError::EmptyLastMessage);
        }
    };

    Ok(ChatTurn { context, message })
}
