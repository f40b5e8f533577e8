//! Authentication Middleware
//!
//! Axum middleware guarding `/auth/*`: verifies the bearer token and injects
//! the caller's [`AuthUser`] for downstream handlers.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::models::AuthUser;
use crate::auth::service::lenient_bearer_token;
use crate::errors::AuthError;
use crate::server::AppState;

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Middleware function for validating JWT tokens
    pub async fn validate_token(
        State(state): State<AppState>,
        mut req: Request,
        next: Next,
    ) -> Response {
        tracing::debug!("[AuthMiddleware] Incoming request: {} {}", req.method(), req.uri());

        let Some(auth_header) = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            tracing::warn!("[AuthMiddleware] Missing Authorization header");
            return AuthError::MissingToken.into_response();
        };

        let token = lenient_bearer_token(auth_header);
        let claims = match state.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("[AuthMiddleware] JWT validation failed for {}", req.uri());
                return e.into_response();
            }
        };

        if state.enforce_revocation {
            match state.auth.is_revoked(token).await {
                Ok(false) => {}
                Ok(true) => {
                    tracing::warn!("[AuthMiddleware] Revoked token presented by sub={}", claims.sub);
                    return AuthError::InvalidToken("Invalid token").into_response();
                }
                Err(e) => return e.into_response(),
            }
        }

        let auth_user = AuthUser::from(claims);
        tracing::debug!(
            "[AuthMiddleware] AuthUser injected: id={}, role={}",
            auth_user.id,
            auth_user.role
        );

        // Insert the user into request extensions for downstream handlers
        req.extensions_mut().insert(auth_user);

        next.run(req).await
    }
}

/// Extension trait for extracting AuthUser from request
pub trait RequestAuthExt {
    fn auth_user(&self) -> Option<&AuthUser>;
    fn require_auth(&self) -> Result<&AuthUser, AuthError>;
}

impl RequestAuthExt for Request {
    fn auth_user(&self) -> Option<&AuthUser> {
        self.extensions().get::<AuthUser>()
    }

    fn require_auth(&self) -> Result<&AuthUser, AuthError> {
        self.auth_user().ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::server::tests::{hmac_state, send};
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use uuid::Uuid;

    async fn whoami(req: Request) -> Result<String, AuthError> {
        let user = req.require_auth()?;
        Ok(format!("{}:{}", user.email, user.role))
    }

    fn gated(state: AppState) -> Router {
        Router::new()
            .route("/auth/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                AuthMiddleware::validate_token,
            ))
            .with_state(state)
    }

    fn get_with(auth: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/auth/whoami");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (status, body) = send(gated(hmac_state(false)), get_with(None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "No token provided");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        for header in ["Bearer garbage", "garbage", "B", "Bearer "] {
            let (status, body) = send(gated(hmac_state(false)), get_with(Some(header))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
            assert_eq!(body["error"]["message"], "Invalid token");
        }
    }

    #[tokio::test]
    async fn test_valid_token_injects_identity() {
        let state = hmac_state(false);
        let token = state.codec.issue(Uuid::new_v4(), "a@x.com", Role::Cashier).unwrap();
        let app = gated(state);

        let response = tower::ServiceExt::oneshot(app.clone(), get_with(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Prefix is optional on the gate
        let response = tower::ServiceExt::oneshot(app, get_with(Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_revocation_enforced_only_when_enabled() {
        for enforce in [false, true] {
            let state = hmac_state(enforce);
            // Never recorded in the store, so it counts as revoked
            let token = state.codec.issue(Uuid::new_v4(), "a@x.com", Role::Owner).unwrap();
            let (status, _) = send(
                gated(state),
                get_with(Some(&format!("Bearer {token}"))),
            )
            .await;
            let expected = if enforce { StatusCode::UNAUTHORIZED } else { StatusCode::OK };
            assert_eq!(status, expected, "enforce_revocation={enforce}");
        }
    }
}
