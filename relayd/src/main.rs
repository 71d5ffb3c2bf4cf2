//! Generative text relay server

use clap::Parser;
use std::process;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod startup;

use cli::Cli;
use config::RelaydConfig;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Read .env before anything consults the environment
    let dotenv = dotenvy::dotenv();

    // Initialize logging; RUST_LOG takes precedence over -v
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env file: {}", e),
    }

    // Load configuration
    let config = match RelaydConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    // Override config with CLI args
    let config = config.with_overrides(&args);

    info!("Gemini API key loaded? {}", config.credential_loaded());

    if let Err(e) = startup::run(config).await {
        error!("Relay failed: {}", e);
        process::exit(1);
    }
}
