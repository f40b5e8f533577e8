//! Signing key material
//!
//! Loaded once at startup from [`SigningConfig`] and shared read-only with the
//! token codec.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SigningConfig;

/// Shortest accepted HMAC shared secret, in bytes
pub const MIN_HMAC_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {kind} key: {source}")]
    InvalidKey {
        kind: &'static str,
        #[source]
        source: jsonwebtoken::errors::Error,
    },

    #[error("HMAC secret must be at least 32 bytes")]
    WeakSecret,

    #[error("RSA private and public keys do not form a pair")]
    Mismatch,
}

/// Which signature scheme the keys belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Shared secret, HS256
    Hmac,
    /// Private key signs, public key verifies, RS256
    Rsa,
}

impl KeyFamily {
    pub fn algorithm(self) -> Algorithm {
        match self {
            KeyFamily::Hmac => Algorithm::HS256,
            KeyFamily::Rsa => Algorithm::RS256,
        }
    }
}

/// Immutable signing and verification keys
#[derive(Clone)]
pub struct KeyMaterial {
    family: KeyFamily,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Load keys as described by the signing configuration
    pub fn load(config: &SigningConfig) -> Result<Self, KeyError> {
        match config {
            SigningConfig::Hmac { secret } => Self::hmac(secret.as_bytes()),
            SigningConfig::Rsa {
                private_key_path,
                public_key_path,
            } => {
                let private_pem = read_key(private_key_path)?;
                let public_pem = read_key(public_key_path)?;
                Self::rsa_from_pem(&private_pem, &public_pem)
            }
        }
    }

    pub fn hmac(secret: &[u8]) -> Result<Self, KeyError> {
        if secret.len() < MIN_HMAC_SECRET_LEN {
            return Err(KeyError::WeakSecret);
        }
        Ok(Self {
            family: KeyFamily::Hmac,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// Build RSA keys from PEM data (PKCS#1 or PKCS#8 private key, SPKI or
    /// PKCS#1 public key). The pair is checked by signing a probe.
    pub fn rsa_from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem).map_err(|source| {
            KeyError::InvalidKey {
                kind: "RSA private",
                source,
            }
        })?;
        let decoding = DecodingKey::from_rsa_pem(public_pem).map_err(|source| {
            KeyError::InvalidKey {
                kind: "RSA public",
                source,
            }
        })?;

        let keys = Self {
            family: KeyFamily::Rsa,
            encoding,
            decoding,
        };
        keys.probe()?;
        Ok(keys)
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    pub fn algorithm(&self) -> Algorithm {
        self.family.algorithm()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    fn probe(&self) -> Result<(), KeyError> {
        let header = Header::new(self.algorithm());
        let probe = json!({ "probe": true, "exp": chrono::Utc::now().timestamp() + 60 });
        let token = encode(&header, &probe, &self.encoding).map_err(|source| {
            KeyError::InvalidKey {
                kind: "RSA private",
                source,
            }
        })?;
        decode::<Value>(&token, &self.decoding, &Validation::new(self.algorithm()))
            .map(|_| ())
            .map_err(|_| KeyError::Mismatch)
    }
}

fn read_key(path: &Path) -> Result<Vec<u8>, KeyError> {
    std::fs::read(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}
