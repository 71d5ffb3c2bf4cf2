//! HTTP presentation layer for the relay
//!
//! Exposes the generate-text and generate-chat endpoints over axum. The
//! provider is injected at construction time and shared read-only by every
//! request.

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Json,
    routing::{get, post},
    Router,
};
use relay_core::prelude::*;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

mod handlers;
mod middleware;

#[cfg(test)]
mod testing;

pub use middleware::AllowedOrigins;

/// Origins allowed when none are configured
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://standarium-erp-frontend.vercel.app",
    "http://127.0.0.1:5500",
];

/// Errors raised while setting up or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid allowed origin '{0}'")]
    InvalidOrigin(String),

    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct RelayServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Upper bound on a single provider call
    pub request_timeout: Duration,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The relay HTTP server
pub struct RelayServer {
    config: RelayServerConfig,
    origins: AllowedOrigins,
    provider: Arc<dyn TextProvider>,
}

impl RelayServer {
    /// Create a new server around an already constructed provider
    pub fn new(
        config: RelayServerConfig,
        provider: Arc<dyn TextProvider>,
    ) -> Result<Self, ServerError> {
        let origins = AllowedOrigins::parse(&config.allowed_origins)?;
        Ok(Self {
            config,
            origins,
            provider,
        })
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        let app_state = AppState {
            provider: self.provider.clone(),
            request_timeout: self.config.request_timeout,
        };

        let origins = Arc::new(self.origins.clone());

        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/api/generate-text", post(handlers::generate::generate_text))
            .route("/api/generate-chat", post(handlers::generate::generate_chat))
            .with_state(app_state)
            .layer(from_fn_with_state(origins, middleware::reject_disallowed_origin))
            .layer(middleware::cors_layer(&self.origins))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(from_fn(middleware::request_logging)),
            )
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn start(self) -> Result<(), ServerError> {
        let address = self.config.bind_address;
        let listener = TcpListener::bind(address).await.map_err(|e| {
            ServerError::StartupFailed(format!("Failed to bind to {}: {}", address, e))
        })?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an existing listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::StartupFailed(format!("Listener has no address: {}", e)))?;
        info!(
            "Relay listening on http://{} (provider {}, model {})",
            local_addr,
            self.provider.name(),
            self.provider.model()
        );

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::StartupFailed(format!("Server error: {}", e)))?;

        info!("Relay stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn TextProvider>,
    pub request_timeout: Duration,
}

/// Endpoint a failure happened in; selects the client-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GenerateText,
    GenerateChat,
}

impl Operation {
    /// Generic message returned for provider failures
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::GenerateText => "Internal server error generating content.",
            Operation::GenerateChat => "Internal server error generating chat.",
        }
    }

    /// Validation error for a body whose field is present but malformed
    pub fn malformed_body(&self) -> ValidationError {
        match self {
            Operation::GenerateText => ValidationError::InvalidPrompt,
            Operation::GenerateChat => ValidationError::InvalidHistory,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::GenerateText => f.write_str("generate-text"),
            Operation::GenerateChat => f.write_str("generate-chat"),
        }
    }
}

/// Convert relay errors to HTTP status codes and responses.
///
/// Provider errors are logged in full and replaced by a generic message.
pub fn handle_relay_error(
    operation: Operation,
    error: RelayError,
) -> (StatusCode, Json<ErrorResponse>) {
    match error {
        RelayError::Validation(e) => {
            debug!("{} rejected: {}", operation, e);
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
        }
        RelayError::Provider(e) => {
            error!("{} failed: {}", operation, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(operation.failure_message())),
            )
        }
    }
}
