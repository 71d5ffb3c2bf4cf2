//! Configuration for the Gemini connector

use secrecy::SecretString;

/// Default model for every relay call
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default Generative Language API base URL
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Gemini API key
    pub api_key: SecretString,
    /// Model to use (e.g., "gemini-2.0-flash")
    pub model: String,
    /// API base URL
    pub api_base: String,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
    /// Temperature for generation (0.0 to 2.0)
    pub temperature: Option<f32>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl GeminiConfig {
    /// Create a new Gemini config with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_secret(SecretString::new(api_key.into()))
    }

    /// Create a new Gemini config from an already wrapped API key
    pub fn from_secret(api_key: SecretString) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            max_output_tokens: None,
            temperature: None,
            timeout_ms: 30_000,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set maximum output tokens
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
