//! Auth routes for registration, login, logout and the caller's identity

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::middleware::AuthMiddleware;
use crate::auth::models::{AuthUser, LoginRequest, RegisterRequest};
use crate::errors::{AuthError, AuthResult};
use crate::server::AppState;

fn success(status: StatusCode, message: &str, payload: Option<Value>) -> Response {
    let mut body = json!({
        "status": "success",
        "message": message,
    });
    if let Some(payload) = payload {
        body["payload"] = payload;
    }
    (status, Json(body)).into_response()
}

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> AuthResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        AuthError::InvalidPayload
    })
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult<Response> {
    let req = json_payload(payload)?;
    state.auth.register(req).await?;
    Ok(success(StatusCode::CREATED, "User registered successfully", None))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Response> {
    let req = json_payload(payload)?;
    let token = state.auth.login(req).await?;
    Ok(success(
        StatusCode::OK,
        "Login successful",
        Some(json!({ "token": token })),
    ))
}

/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AuthResult<Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::Validation(vec!["authorization header is not valid text".into()]))?;

    state.auth.logout(authorization).await?;
    Ok(success(StatusCode::OK, "Logged out successfully", None))
}

/// `GET /auth/me`: the identity the gate attached to this request
pub async fn me(Extension(user): Extension<AuthUser>) -> Response {
    success(StatusCode::OK, "Authenticated", Some(json!(user)))
}

pub fn create_auth_routes(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .layer(middleware::from_fn_with_state(
            state,
            AuthMiddleware::validate_token,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(gated)
}
