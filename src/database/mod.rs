//! # Database Module
//!
//! Credential persistence: the [`store::CredentialStore`] contract, its
//! PostgreSQL implementation (tokio-postgres + deadpool, refinery migrations)
//! and an in-memory implementation.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod store;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use memory::InMemoryStore;
pub use store::CredentialStore;
