//! Credential Store
//!
//! The narrow set of keyed queries the authentication core needs, plus the
//! PostgreSQL implementation on top of [`DatabaseConnection`].

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use crate::database::connection::DatabaseConnection;
use crate::database::models::{FromRow, NewUser, TokenRecord, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (duplicate email)
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn insert_token(&self, user_id: Uuid, token: &str) -> StoreResult<()>;

    /// Live (not revoked) record for an exact token string
    async fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>>;

    /// Revoke every live record matching the token string; returns rows affected
    async fn delete_token(&self, token: &str) -> StoreResult<u64>;

    async fn health_check(&self) -> StoreResult<()>;
}

#[async_trait]
impl CredentialStore for DatabaseConnection {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let client = self.pool().get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, name, email, password_hash, role, created_at, updated_at \
                 FROM users WHERE email = $1 AND deleted_at IS NULL",
                &[&email],
            )
            .await
            .context("Failed to query user by email")?;

        row.map(|r| User::from_row(&r))
            .transpose()
            .context("Failed to decode user row")
            .map_err(StoreError::from)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let client = self.pool().get().await.context("Failed to get DB connection")?;
        let row = client
            .query_one(
                "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) \
                 RETURNING id, name, email, password_hash, role, created_at, updated_at",
                &[&user.name, &user.email, &user.password_hash, &user.role.as_str()],
            )
            .await
            .map_err(|e| {
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                    StoreError::UniqueViolation
                } else {
                    StoreError::Backend(anyhow::Error::new(e).context("Failed to insert user"))
                }
            })?;

        User::from_row(&row)
            .context("Failed to decode inserted user row")
            .map_err(StoreError::from)
    }

    async fn insert_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        let client = self.pool().get().await.context("Failed to get DB connection")?;
        client
            .execute(
                "INSERT INTO tokens (user_id, token) VALUES ($1, $2)",
                &[&user_id, &token],
            )
            .await
            .context("Failed to insert token")?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        let client = self.pool().get().await.context("Failed to get DB connection")?;
        let row = client
            .query_opt(
                "SELECT id, user_id, token, created_at FROM tokens \
                 WHERE token = $1 AND deleted_at IS NULL LIMIT 1",
                &[&token],
            )
            .await
            .context("Failed to query token")?;

        row.map(|r| TokenRecord::from_row(&r))
            .transpose()
            .context("Failed to decode token row")
            .map_err(StoreError::from)
    }

    async fn delete_token(&self, token: &str) -> StoreResult<u64> {
        let client = self.pool().get().await.context("Failed to get DB connection")?;
        let n = client
            .execute(
                "UPDATE tokens SET deleted_at = NOW(), updated_at = NOW() \
                 WHERE token = $1 AND deleted_at IS NULL",
                &[&token],
            )
            .await
            .context("Failed to revoke token")?;
        Ok(n)
    }

    async fn health_check(&self) -> StoreResult<()> {
        DatabaseConnection::health_check(self).await?;
        Ok(())
    }
}
