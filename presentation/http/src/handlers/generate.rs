//! Text and chat generation handlers

use crate::{handle_relay_error, AppState, Operation};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use relay_core::prelude::*;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

type HandlerResult = Result<Json<GenerationResponse>, (StatusCode, Json<ErrorResponse>)>;

/// Await a provider call, turning an elapsed deadline into a provider timeout
async fn call_provider<F>(timeout: Duration, call: F) -> ProviderResult<String>
where
    F: Future<Output = ProviderResult<String>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout))
}

/// Unwrap a JSON body.
///
/// A missing or unparseable body counts as one with no fields. Well-formed
/// JSON whose fields have the wrong shape is reported as malformed.
fn read_body<T: Default>(
    operation: Operation,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ValidationError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::JsonDataError(e)) => {
            debug!("{} body malformed: {}", operation, e.body_text());
            Err(operation.malformed_body())
        }
        Err(rejection) => {
            debug!("{} body not usable: {}", operation, rejection.body_text());
            Ok(T::default())
        }
    }
}

/// Generate text from a single prompt
pub async fn generate_text(
    State(state): State<AppState>,
    payload: Result<Json<GenerateTextRequest>, JsonRejection>,
) -> HandlerResult {
    let operation = Operation::GenerateText;
    let prompt = read_body(operation, payload)
        .and_then(|request| validate_prompt(request.prompt))
        .map_err(|e| handle_relay_error(operation, e.into()))?;

    let text = call_provider(state.request_timeout, state.provider.generate_text(&prompt))
        .await
        .map_err(|e| handle_relay_error(operation, e.into()))?;

    Ok(Json(GenerationResponse { text }))
}

/// Continue a conversation whose last history entry is the new user turn
pub async fn generate_chat(
    State(state): State<AppState>,
    payload: Result<Json<GenerateChatRequest>, JsonRejection>,
) -> HandlerResult {
    let operation = Operation::GenerateChat;
    let turn = read_body(operation, payload)
        .and_then(|request| split_history(request.history))
        .map_err(|e| handle_relay_error(operation, e.into()))?;

    debug!("Chat turn with {} context entries", turn.context.len());

    let text = call_provider(
        state.request_timeout,
        state.provider.generate_chat(&turn.context, &turn.message),
    )
    .await
    .map_err(|e| handle_relay_error(operation, e.into()))?;

    Ok(Json(GenerationResponse { text }))
}
