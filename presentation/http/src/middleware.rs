//! Middleware for the relay server

use crate::ServerError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use relay_core::types::ErrorResponse;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

/// Parsed cross-origin allow-list
#[derive(Debug, Clone)]
pub struct AllowedOrigins(Vec<HeaderValue>);

impl AllowedOrigins {
    /// Parse configured origins into header values.
    ///
    /// Wildcards are refused; every origin must be listed explicitly.
    pub fn parse(origins: &[String]) -> Result<Self, ServerError> {
        origins
            .iter()
            .map(|o| {
                let trimmed = o.trim_end_matches('/');
                if trimmed == "*" {
                    return Err(ServerError::InvalidOrigin(o.clone()));
                }
                HeaderValue::from_str(trimmed).map_err(|_| ServerError::InvalidOrigin(o.clone()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, origin: &HeaderValue) -> bool {
        self.0.iter().any(|allowed| allowed == origin)
    }

    pub fn as_slice(&self) -> &[HeaderValue] {
        &self.0
    }
}

/// CORS policy: the configured origins, GET/POST, and only `Content-Type`
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.as_slice().iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Refuse cross-origin requests from origins outside the allow-list.
///
/// Requests without an `Origin` header are not cross-origin and pass through.
pub async fn reject_disallowed_origin(
    State(origins): State<Arc<AllowedOrigins>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !origins.contains(origin) {
            warn!(
                "Rejected {} {} from origin {:?}",
                request.method(),
                request.uri(),
                origin
            );
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Origin not allowed.")),
            )
                .into_response();
        }
    }

    next.run(request).await
}

/// Request logging middleware
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    debug!("Incoming request: {} {}", method, uri);

    let response = next.run(request).await;

    let duration = start_time.elapsed();
    let status = response.status();

    if status.is_success() {
        info!("{} {} - {} ({:?})", method, uri, status, duration);
    } else {
        warn!("{} {} - {} ({:?})", method, uri, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins() {
        let origins = AllowedOrigins::parse(&[
            "https://app.example.com/".to_string(),
            "http://127.0.0.1:5500".to_string(),
        ])
        .unwrap();

        assert!(origins.contains(&HeaderValue::from_static("https://app.example.com")));
        assert!(origins.contains(&HeaderValue::from_static("http://127.0.0.1:5500")));
        assert!(!origins.contains(&HeaderValue::from_static("http://127.0.0.1:5501")));
    }

    #[test]
    fn test_parse_rejects_invalid_header_value() {
        let result = AllowedOrigins::parse(&["https://a.example\r\n".to_string()]);
        assert!(matches!(result, Err(ServerError::InvalidOrigin(_))));
    }

    #[test]
    fn test_parse_rejects_wildcard() {
        let result = AllowedOrigins::parse(&["*".to_string()]);
        assert!(matches!(result, Err(ServerError::InvalidOrigin(_))));
    }

    #[test]
    fn test_empty_allow_list_allows_nothing() {
        let origins = AllowedOrigins::parse(&[]).unwrap();
        assert!(!origins.contains(&HeaderValue::from_static("http://localhost:3000")));
    }
}
