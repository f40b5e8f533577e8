//! # Auth Service
//!
//! Issues, verifies and revokes bearer tokens for registered users. Built
//! with Axum and Tokio on a PostgreSQL credential store.
//!
//! ## Endpoints
//! - `POST /register` create a user
//! - `POST /login` exchange credentials for a signed token
//! - `POST /auth/logout` revoke the presented token (gated)
//! - `GET /auth/me` identity carried by the presented token (gated)
//! - `GET /ping` health check
//!
//! ## Environment Setup
//! Copy `.env.example` to `.env` and configure. RS256 (default) needs a PEM
//! key pair:
//! ```bash
//! openssl genrsa -out private.key 2048
//! openssl rsa -in private.key -pubout -out public.key
//! ```
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```

mod auth;
mod config;
mod database;
mod errors;
mod routes;
mod server;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; variables may come from the environment
    let dotenv_result = dotenv::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    if let Err(e) = dotenv_result {
        tracing::debug!("No .env file loaded: {}", e);
    }

    tracing::info!("🏁 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env()?;
    if let Err(e) = server::start(config).await {
        tracing::error!("Auth service failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
