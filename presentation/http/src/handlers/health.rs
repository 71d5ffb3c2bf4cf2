//! Health check handler

use crate::AppState;
use axum::{extract::State, response::Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub provider: String,
    pub model: String,
    pub timestamp: String,
}

/// Health check endpoint; never calls the provider
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.provider.name().to_string(),
        model: state.provider.model().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
