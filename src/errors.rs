//! # Error Types
//!
//! Handler-level error taxonomy and its uniform JSON envelope:
//! `{"status": "fail", "error": {"code": <http status>, "message": "..."}}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::database::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// One entry per violated input rule, in field order
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("{0}")]
    InvalidToken(&'static str),

    #[error("No token provided")]
    MissingToken,

    #[error("Error hashing password: {0}")]
    Hashing(String),

    #[error("Error generating token: {0}")]
    Signing(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidPayload | AuthError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InvalidCredentials(_)
            | AuthError::InvalidToken(_)
            | AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Backend failures are logged, not echoed.
    fn public_message(&self) -> String {
        match self {
            AuthError::Hashing(_) => "Error hashing password".to_string(),
            AuthError::Signing(_) => "Error generating token".to_string(),
            AuthError::Persistence(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => AuthError::DuplicateEmail,
            StoreError::Backend(e) => AuthError::Persistence(format!("{e:#}")),
        }
    }
}

/// Renders `{"status": "fail", "error": {"code", "message"}}` with the given status.
pub fn fail_body(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(json!({
        "status": "fail",
        "error": {
            "code": status.as_u16(),
            "message": message.into(),
        },
    }));
    (status, body).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        fail_body(status, self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::Validation(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::InvalidCredentials("User not found").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Signing("bad key".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_email() {
        let err: AuthError = StoreError::UniqueViolation.into();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_envelope_hides_backend_detail() {
        let response = AuthError::Persistence("connection refused on 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["error"]["code"], 500);
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_validation_message_lists_rules_in_order() {
        let err = AuthError::Validation(vec![
            "name is required".into(),
            "password must be at least 6 characters".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "name is required; password must be at least 6 characters"
        );
    }
}
