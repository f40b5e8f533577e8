use axum::{extract::State, http::StatusCode, response::{IntoResponse, Json, Response}};
use serde_json::json;

use crate::database::CredentialStore;
use crate::errors::fail_body;
use crate::server::AppState;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
///
/// # Response Format
/// ```json
/// { "status": "pong" }
/// ```
///
/// # HTTP Status Codes
/// - **200 OK**: Server is up and the credential store answers
/// - **503 Service Unavailable**: The credential store is unreachable
pub async fn ping(State(state): State<AppState>) -> Response {
    match state.auth.store().health_check().await {
        Ok(()) => Json(json!({ "status": "pong" })).into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            fail_body(StatusCode::SERVICE_UNAVAILABLE, "Credential store unavailable")
        }
    }
}
