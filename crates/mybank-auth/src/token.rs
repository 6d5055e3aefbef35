//! Signed, time-bounded tokens.
//!
//! [`TokenMaker`] is the seam the auth service issues and verifies
//! credentials through. [`JwtMaker`] is the HS256 JWT implementation;
//! access and refresh tokens are both plain payload instances that only
//! differ in lifetime.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mybank_core::models::user::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// The verified content of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Fresh random id per token. For refresh tokens this is also the
    /// session id.
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenMaker: Send + Sync {
    /// Issue a token for `username` that expires after `ttl`.
    fn create(
        &self,
        username: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<(String, Payload), AuthError>;

    /// Check signature, shape, and expiry. Nothing else.
    fn verify(&self, token: &str) -> Result<Payload, AuthError>;
}

/// JWT claims carried by every token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Unique token ID (UUID string).
    jti: String,
    /// Subject, the username.
    sub: String,
    role: Role,
    iss: String,
    /// Issued-at (Unix timestamp).
    iat: i64,
    /// Expiration (Unix timestamp).
    exp: i64,
}

/// HS256 [`TokenMaker`].
#[derive(Clone)]
pub struct JwtMaker {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl JwtMaker {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret {
                min: MIN_SECRET_LEN,
            });
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Self::new(config.token_secret.as_bytes(), config.token_issuer.clone())
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::TokenInvalid(format!("timestamp out of range: {secs}")))
}

impl TokenMaker for JwtMaker {
    fn create(
        &self,
        username: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<(String, Payload), AuthError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AuthError::InvalidConfig(format!("token lifetime out of range: {ttl}"))
        })?;
        let id = Uuid::new_v4();
        let claims = Claims {
            jti: id.to_string(),
            sub: username.to_string(),
            role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

        let payload = Payload {
            id,
            username: claims.sub,
            role,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        };
        Ok((token, payload))
    }

    fn verify(&self, token: &str) -> Result<Payload, AuthError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        let id = Uuid::parse_str(&claims.jti)
            .map_err(|e| AuthError::TokenInvalid(format!("invalid token id: {e}")))?;

        Ok(Payload {
            id,
            username: claims.sub,
            role: claims.role,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}
