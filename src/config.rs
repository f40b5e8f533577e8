//! Configuration module for environment variables and application settings

use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::path::PathBuf;

use crate::auth::jwt::DEFAULT_TTL_HOURS;

#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Which credential store backs the service
    pub store: StoreBackend,

    /// Token signing and verification
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Postgres {
        url: String,
        max_connections: usize,
        ssl: bool,
    },
    /// Non-persistent, for local development
    Memory,
}

/// Signing algorithm family and where its keys come from
#[derive(Clone)]
pub enum SigningConfig {
    /// HS256 with a shared secret
    Hmac { secret: String },
    /// RS256 with PEM key files
    Rsa {
        private_key_path: PathBuf,
        public_key_path: PathBuf,
    },
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningConfig::Hmac { .. } => f.write_str("Hmac { secret: <redacted> }"),
            SigningConfig::Rsa {
                private_key_path,
                public_key_path,
            } => f
                .debug_struct("Rsa")
                .field("private_key_path", private_key_path)
                .field("public_key_path", public_key_path)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub signing: SigningConfig,
    /// Token lifetime in hours
    pub token_ttl_hours: i64,
    /// Reject tokens on gated routes once they have been logged out
    pub enforce_revocation: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port_raw = var("PORT")
            .or_else(|| var("AUTH_SERVICE_PORT"))
            .unwrap_or_else(|| "8080".to_string());
        let port: u16 = port_raw
            .parse()
            .with_context(|| format!("Invalid port '{port_raw}'"))?;

        let server = ServerConfig {
            host: get_or("SERVER_HOST", "0.0.0.0"),
            port,
            cors_allowed_origins: get_or("CORS_ALLOWED_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
        };

        let store = match get_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
            "postgres" | "postgresql" => StoreBackend::Postgres {
                url: var("DATABASE_URL")
                    .or_else(|| var("DB_DSN"))
                    .ok_or_else(|| anyhow!("DATABASE_URL (or DB_DSN) environment variable is required"))?,
                max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", 16)?,
                ssl: parse_bool(&var, "DATABASE_SSL")?,
            },
            "memory" => StoreBackend::Memory,
            other => bail!("Unknown STORE_BACKEND '{other}', expected postgres or memory"),
        };

        let signing = match get_or("JWT_ALGORITHM", "RS256").to_uppercase().as_str() {
            "RS256" => SigningConfig::Rsa {
                private_key_path: get_or("JWT_PRIVATE_KEY_PATH", "private.key").into(),
                public_key_path: get_or("JWT_PUBLIC_KEY_PATH", "public.key").into(),
            },
            "HS256" => SigningConfig::Hmac {
                secret: var("JWT_SECRET")
                    .ok_or_else(|| anyhow!("JWT_SECRET is required when JWT_ALGORITHM=HS256"))?,
            },
            other => bail!("Unsupported JWT_ALGORITHM '{other}', expected RS256 or HS256"),
        };

        let token_ttl_hours: i64 = parse_or(&var, "JWT_TTL_HOURS", DEFAULT_TTL_HOURS)?;
        if token_ttl_hours <= 0 {
            bail!("JWT_TTL_HOURS must be positive");
        }

        Ok(Self {
            server,
            store,
            auth: AuthConfig {
                signing,
                token_ttl_hours,
                enforce_revocation: parse_bool(&var, "AUTH_ENFORCE_REVOCATION")?,
            },
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(false),
        Some(other) => bail!("Invalid boolean for {key}: '{other}'"),
    }
}
