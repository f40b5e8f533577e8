//! In-memory credential store.
//!
//! Backs `STORE_BACKEND=memory` for local development and the test suite.
//! Email uniqueness is enforced atomically through the map's entry API, the
//! same guarantee the unique index gives in PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use uuid::Uuid;

use crate::database::models::{NewUser, TokenRecord, User};
use crate::database::store::{CredentialStore, StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    users: Arc<DashMap<String, User>>,
    tokens: Arc<DashMap<String, Vec<TokenRecord>>>,
    next_token_id: Arc<AtomicI64>,
    fail_token_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_token` fail. Test hook for the
    /// best-effort token write on login.
    pub fn set_fail_token_writes(&self, fail: bool) {
        self.fail_token_writes.store(fail, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn live_token_count(&self) -> usize {
        self.tokens.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(email).map(|user| user.value().clone()))
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::UniqueViolation),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = User {
                    id: Uuid::new_v4(),
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    role: user.role,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn insert_token(&self, user_id: Uuid, token: &str) -> StoreResult<()> {
        if self.fail_token_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("token table unavailable").into());
        }
        let record = TokenRecord {
            id: self.next_token_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            token: token.to_string(),
            created_at: Utc::now(),
        };
        self.tokens.entry(token.to_string()).or_default().push(record);
        Ok(())
    }

    async fn find_token(&self, token: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self
            .tokens
            .get(token)
            .and_then(|records| records.value().first().cloned()))
    }

    async fn delete_token(&self, token: &str) -> StoreResult<u64> {
        Ok(self
            .tokens
            .remove(token)
            .map(|(_, records)| records.len() as u64)
            .unwrap_or(0))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".into(),
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
            role: Role::Owner,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = InMemoryStore::new();
        let first = store.insert_user(new_user("a@x.com")).await.unwrap();
        let second = store.insert_user(new_user("a@x.com")).await;
        assert!(matches!(second, Err(StoreError::UniqueViolation)));

        let found = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("a@x.com")).await.unwrap();
        assert!(store.find_user_by_email("A@x.com").await.unwrap().is_none());
        assert!(store.insert_user(new_user("A@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_admit_one() {
        let store = InMemoryStore::new();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_user(new_user("race@x.com")).await.is_ok()
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_token_revocation_counts_rows() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        store.insert_token(user_id, "tok").await.unwrap();

        let found = store.find_token("tok").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);

        assert_eq!(store.delete_token("tok").await.unwrap(), 1);
        assert_eq!(store.delete_token("tok").await.unwrap(), 0);
        assert!(store.find_token("tok").await.unwrap().is_none());
        assert_eq!(store.delete_token("never-issued").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_token_writes() {
        let store = InMemoryStore::new();
        store.set_fail_token_writes(true);
        assert!(store.insert_token(Uuid::new_v4(), "tok").await.is_err());
        assert_eq!(store.live_token_count(), 0);
    }
}
