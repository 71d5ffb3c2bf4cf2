//! Wiring from configuration to a running server

use crate::config::{ConfigError, RelaydConfig};
use relay_connector_gemini::GeminiConnector;
use relay_core::{ProviderError, TextProvider};
use relay_http::{RelayServer, ServerError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Fatal errors that stop the process
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create provider: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Construct the provider and server. Nothing is bound yet.
pub fn build(config: &RelaydConfig) -> Result<RelayServer, StartupError> {
    let gemini = config.gemini_config()?;
    let provider: Arc<dyn TextProvider> = Arc::new(GeminiConnector::new(gemini)?);

    info!("Using provider {} with model {}", provider.name(), provider.model());

    Ok(RelayServer::new(config.server_config(), provider)?)
}

/// Build the server and serve until a shutdown signal
pub async fn run(config: RelaydConfig) -> Result<(), StartupError> {
    let server = build(&config)?;
    server.start().await?;
    Ok(())
}
