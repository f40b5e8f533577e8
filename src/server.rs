//! # Server Module
//!
//! HTTP server setup and route configuration for the auth service.

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use chrono::Duration;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::auth::jwt::TokenCodec;
use crate::auth::keys::KeyMaterial;
use crate::auth::service::AuthService;
use crate::config::{Config, StoreBackend};
use crate::database::{CredentialStore, DatabaseConfig, DatabaseConnection, InMemoryStore};
use crate::routes::{auth::create_auth_routes, health::ping};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub codec: Arc<TokenCodec>,
    /// Whether the gate consults the token store on every request
    pub enforce_revocation: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec, enforce_revocation: bool) -> Self {
        let codec = Arc::new(codec);
        Self {
            auth: AuthService::new(store, codec.clone()),
            codec,
            enforce_revocation,
        }
    }
}

/// All routes with state applied; `/register` and `/login` are open, `/auth/*`
/// is gated.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .merge(create_auth_routes(state.clone()))
        .with_state(state)
}

async fn open_store(backend: &StoreBackend) -> Result<Arc<dyn CredentialStore>> {
    match backend {
        StoreBackend::Postgres {
            url,
            max_connections,
            ssl,
        } => {
            let db_config = DatabaseConfig::from_url(url)?
                .with_max_size(*max_connections)
                .with_ssl(*ssl);
            let db = DatabaseConnection::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await?;
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            tracing::warn!("⚠️  Using in-memory credential store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ]))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Starts the auth HTTP server.
///
/// Key material and the store are set up before the listener is bound; any
/// failure there aborts startup.
pub async fn start(config: Config) -> Result<()> {
    let keys = KeyMaterial::load(&config.auth.signing).context("Failed to load signing keys")?;
    tracing::info!("🔑 Signing keys loaded ({:?})", keys.algorithm());
    let codec = TokenCodec::new(keys, Duration::hours(config.auth.token_ttl_hours));

    let store = open_store(&config.store).await?;
    let state = AppState::new(store, codec, config.auth.enforce_revocation);
    if state.enforce_revocation {
        tracing::info!("Revoked tokens are rejected on /auth/* routes");
    }

    let app = build_router(state)
        .layer(ServiceBuilder::new().layer(cors_layer(&config.server.cors_allowed_origins)?));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 Auth service listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}
