//! Authentication Service
//!
//! Orchestrates register, login and logout over the credential store, the
//! password hasher and the token codec.

use std::sync::Arc;

use crate::auth::jwt::TokenCodec;
use crate::auth::models::{LoginRequest, RegisterRequest};
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::validation::{validate_login, validate_register};
use crate::database::models::{NewUser, PublicUser};
use crate::database::store::CredentialStore;
use crate::errors::{AuthError, AuthResult};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Create a user account. The email pre-check is an optimization; the
    /// store's uniqueness guarantee decides concurrent registrations.
    pub async fn register(&self, req: RegisterRequest) -> AuthResult<PublicUser> {
        let valid = validate_register(&req)?;

        if self.store.find_user_by_email(valid.email).await?.is_some() {
            tracing::info!("[AuthService] Registration rejected: email already exists");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password_blocking(valid.password.to_string()).await?;
        let user = self
            .store
            .insert_user(NewUser {
                name: valid.name.to_string(),
                email: valid.email.to_string(),
                password_hash,
                role: valid.role,
            })
            .await?;

        tracing::info!("[AuthService] Registered user id={} role={}", user.id, user.role);
        Ok(PublicUser::from(&user))
    }

    /// Check credentials and issue a bearer token
    pub async fn login(&self, req: LoginRequest) -> AuthResult<String> {
        validate_login(&req)?;

        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or(AuthError::InvalidCredentials("User not found"))?;

        if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
            tracing::info!("[AuthService] Login rejected for user id={}: bad password", user.id);
            return Err(AuthError::InvalidCredentials("Invalid password"));
        }

        let token = self.codec.issue(user.id, &user.email, user.role)?;

        // Best effort: the login succeeds even if the record cannot be written.
        if let Err(e) = self.store.insert_token(user.id, &token).await {
            tracing::warn!(
                "[AuthService] Failed to record token for user id={}: {}",
                user.id,
                e
            );
        }

        tracing::info!("[AuthService] Login successful for user id={}", user.id);
        Ok(token)
    }

    /// Revoke the token carried by an `Authorization` header value
    pub async fn logout(&self, authorization: &str) -> AuthResult<()> {
        let token = strict_bearer_token(authorization)?;

        let revoked = self.store.delete_token(token).await?;
        if revoked == 0 {
            return Err(AuthError::InvalidToken(
                "Token not found or already invalidated",
            ));
        }

        tracing::info!("[AuthService] Token revoked ({} record(s))", revoked);
        Ok(())
    }

    /// Whether the token has no live record in the store
    pub async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        Ok(self.store.find_token(token).await?.is_none())
    }
}

/// Extract the token from `Bearer <token>`, rejecting anything else
pub fn strict_bearer_token(authorization: &str) -> AuthResult<&str> {
    match authorization.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(AuthError::Validation(vec![
            "authorization header must be of the form 'Bearer <token>'".to_string(),
        ])),
    }
}

/// Extract the token, passing the raw value through when the prefix is absent
pub fn lenient_bearer_token(authorization: &str) -> &str {
    authorization
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(authorization)
}
