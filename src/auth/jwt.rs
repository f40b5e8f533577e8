//! JWT Token Codec
//!
//! Issues and verifies signed, expiring tokens carrying the user's id, email
//! and role. The algorithm is fixed by the loaded [`KeyMaterial`]; tokens
//! signed with any other algorithm are rejected.

use chrono::{Duration, Utc};
use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::keys::KeyMaterial;
use crate::auth::models::{AuthUser, Role};
use crate::errors::{AuthError, AuthResult};

/// Value of the `iss` claim on every issued token
pub const ISSUER: &str = "auth-service";

/// Default token lifetime (3 days)
pub const DEFAULT_TTL_HOURS: i64 = 72;

/// JWT Claims structure containing user information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User unique identifier
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issuer
    pub iss: String,
    /// Unique per issuance; two logins in the same second still differ
    pub jti: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Signs and verifies tokens with immutable key material
#[derive(Clone)]
pub struct TokenCodec {
    keys: KeyMaterial,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(keys: KeyMaterial, ttl: Duration) -> Self {
        let mut validation = Validation::new(keys.algorithm());
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            keys,
            validation,
            ttl,
        }
    }

    /// Issue a token for a user, expiring `ttl` from now
    pub fn issue(&self, user_id: Uuid, email: &str, role: Role) -> AuthResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(
            &Header::new(self.keys.algorithm()),
            claims,
            self.keys.encoding_key(),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, issuer and expiry, returning the claims.
    ///
    /// Every failure collapses to the same `InvalidToken` error.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let data = decode::<Claims>(token, self.keys.decoding_key(), &self.validation)
            .map_err(|e| {
                tracing::debug!("[TokenCodec] Rejected token: {}", e);
                AuthError::InvalidToken("Invalid token")
            })?;

        if data.claims.exp <= Utc::now().timestamp() {
            tracing::debug!("[TokenCodec] Rejected token: expired");
            return Err(AuthError::InvalidToken("Invalid token"));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::tests::{OTHER_PRIVATE_PEM, PRIVATE_PEM, PUBLIC_PEM, TEST_SECRET};
    use jsonwebtoken::{Algorithm, EncodingKey};

    fn hmac_codec() -> TokenCodec {
        TokenCodec::new(
            KeyMaterial::hmac(TEST_SECRET).unwrap(),
            Duration::hours(DEFAULT_TTL_HOURS),
        )
    }

    fn rsa_codec() -> TokenCodec {
        TokenCodec::new(
            KeyMaterial::rsa_from_pem(PRIVATE_PEM, PUBLIC_PEM).unwrap(),
            Duration::hours(DEFAULT_TTL_HOURS),
        )
    }

    fn assert_roundtrip(codec: &TokenCodec) {
        let user_id = Uuid::new_v4();
        let token = codec.issue(user_id, "a@x.com", Role::Owner).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.iss, ISSUER);

        let expected = (Utc::now() + Duration::hours(72)).timestamp();
        assert!((claims.exp - expected).abs() <= 5);
    }

    #[test]
    fn test_hmac_roundtrip() {
        assert_roundtrip(&hmac_codec());
    }

    #[test]
    fn test_rsa_roundtrip() {
        assert_roundtrip(&rsa_codec());
    }

    #[test]
    fn test_each_issuance_is_unique() {
        for codec in [hmac_codec(), rsa_codec()] {
            let user_id = Uuid::new_v4();
            let first = codec.issue(user_id, "a@x.com", Role::Owner).unwrap();
            let second = codec.issue(user_id, "a@x.com", Role::Owner).unwrap();
            assert_ne!(first, second);
            assert_ne!(
                codec.verify(&first).unwrap().jti,
                codec.verify(&second).unwrap().jti
            );
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        for codec in [hmac_codec(), rsa_codec()] {
            let token = codec.issue(Uuid::new_v4(), "a@x.com", Role::Cashier).unwrap();
            let segments: Vec<&str> = token.split('.').collect();
            assert_eq!(segments.len(), 3);

            // Flip one character inside each segment, avoiding the final
            // character which may carry only padding bits.
            for (idx, segment) in segments.iter().enumerate() {
                let mut chars: Vec<char> = segment.chars().collect();
                let pos = chars.len() / 2;
                chars[pos] = if chars[pos] == 'A' { 'B' } else { 'A' };
                let mut parts: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
                parts[idx] = chars.into_iter().collect();
                let tampered = parts.join(".");

                assert!(
                    codec.verify(&tampered).is_err(),
                    "tampered segment {idx} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_token_from_other_key_rejected() {
        let other_hmac = TokenCodec::new(
            KeyMaterial::hmac(b"a-completely-different-secret-of-32-bytes").unwrap(),
            Duration::hours(1),
        );
        let token = other_hmac.issue(Uuid::new_v4(), "a@x.com", Role::Admin).unwrap();
        assert!(hmac_codec().verify(&token).is_err());

        // Re-signed with a foreign RSA private key
        let claims = rsa_codec()
            .verify(&rsa_codec().issue(Uuid::new_v4(), "a@x.com", Role::Admin).unwrap())
            .unwrap();
        let foreign = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(OTHER_PRIVATE_PEM).unwrap(),
        )
        .unwrap();
        assert!(rsa_codec().verify(&foreign).is_err());
    }

    #[test]
    fn test_algorithm_substitution_rejected() {
        // HS256 token keyed with the RSA public key bytes
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::Admin,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iss: ISSUER.into(),
            jti: Uuid::new_v4(),
        };
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(PUBLIC_PEM),
        )
        .unwrap();
        assert!(rsa_codec().verify(&forged).is_err());

        // Cross-family tokens never verify
        let hmac_token = hmac_codec().issue(Uuid::new_v4(), "a@x.com", Role::User).unwrap();
        assert!(rsa_codec().verify(&hmac_token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = hmac_codec();
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::Owner,
            iat: (now - Duration::hours(73)).timestamp(),
            exp: (now - Duration::seconds(10)).timestamp(),
            iss: ISSUER.into(),
            jti: Uuid::new_v4(),
        };
        let token = codec.sign(&claims).unwrap();
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let codec = hmac_codec();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            role: Role::Owner,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iss: "someone-else".into(),
            jti: Uuid::new_v4(),
        };
        let token = codec.sign(&claims).unwrap();
        assert!(codec.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(hmac_codec().verify("").is_err());
        assert!(hmac_codec().verify("not.a.jwt").is_err());
    }
}
