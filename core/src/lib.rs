//! # Relay Core
//!
//! Core types, validation and the provider trait for the generative text
//! relay. Connectors implement [`TextProvider`]; presentation layers call
//! the validation functions before delegating to a provider.

pub mod errors;
pub mod traits;
pub mod types;
pub mod validation;

// Re-export commonly used types and traits
pub use errors::{ProviderError, RelayError, ValidationError};
pub use traits::TextProvider;
pub use types::{ChatMessage, ChatTurn, Prompt, Role};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::traits::*;
    pub use crate::types::*;
    pub use crate::validation::*;
    pub use async_trait::async_trait;
}
