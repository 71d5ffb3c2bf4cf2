//! Configuration management for relayd

use crate::cli::Cli;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use relay_connector_gemini::{GeminiConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use relay_http::{RelayServerConfig, DEFAULT_ALLOWED_ORIGINS};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config files picked up from the working directory
const DEFAULT_CONFIG_PATHS: &[&str] = &["relay.yaml", "relay.yml"];

/// Unprefixed variables read for compatibility with common deployments
const RAW_ENV_KEYS: &[&str] = &["port", "gemini_api_key"];

/// Largest accepted provider call timeout
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Errors raised while loading or applying configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingCredential,

    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("request_timeout_secs must be between 1 and 600, got {0}")]
    InvalidTimeout(u64),

    #[error("Failed to parse configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Configuration for the relay server
#[derive(Debug, Clone, Deserialize)]
pub struct RelaydConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Provider credential; required to start
    #[serde(default)]
    pub gemini_api_key: Option<SecretString>,
    /// Model used for every call
    #[serde(default = "default_model")]
    pub model: String,
    /// Generative Language API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Browser origins allowed to call the API
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Upper bound on a single provider call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RelaydConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gemini_api_key: None,
            model: default_model(),
            api_base: default_api_base(),
            allowed_origins: default_allowed_origins(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl RelaydConfig {
    /// Load configuration from file and environment.
    ///
    /// Later sources win: config file, `PORT`/`GEMINI_API_KEY`, then `RELAY_*`.
    pub fn load(config_path: &Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();

        for path in DEFAULT_CONFIG_PATHS {
            if Path::new(path).exists() {
                figment = figment.merge(Yaml::file(path));
                break;
            }
        }

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment
            .merge(Env::raw().only(RAW_ENV_KEYS))
            .merge(Env::prefixed("RELAY_"));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))?;
        config.timeout_ms()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration
    pub fn with_overrides(mut self, args: &Cli) -> Self {
        if let Some(host) = args.host {
            self.host = host;
        }

        if let Some(port) = args.port {
            self.port = port;
        }

        if let Some(ref model) = args.model {
            self.model = model.clone();
        }

        self
    }

    /// Whether a non-empty credential was supplied
    pub fn credential_loaded(&self) -> bool {
        self.gemini_api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }

    /// Build the connector configuration; fails without a credential
    pub fn gemini_config(&self) -> Result<GeminiConfig, ConfigError> {
        let api_key = match &self.gemini_api_key {
            Some(key) if !key.expose_secret().is_empty() => key.clone(),
            _ => return Err(ConfigError::MissingCredential),
        };

        let mut config = GeminiConfig::from_secret(api_key)
            .with_model(&self.model)
            .with_api_base(&self.api_base)
            .with_timeout(self.timeout_ms()?);

        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            config = config.with_max_output_tokens(max_output_tokens);
        }

        Ok(config)
    }

    /// Build the HTTP server configuration
    pub fn server_config(&self) -> RelayServerConfig {
        RelayServerConfig {
            bind_address: self.bind_address(),
            allowed_origins: self.allowed_origins.clone(),
            request_timeout: self.request_timeout(),
        }
    }

    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn timeout_ms(&self) -> Result<u64, ConfigError> {
        match self.request_timeout_secs {
            secs @ 1..=MAX_REQUEST_TIMEOUT_SECS => Ok(secs * 1000),
            secs => Err(ConfigError::InvalidTimeout(secs)),
        }
    }
}
