//! Authentication configuration.

use chrono::Duration;

use crate::error::AuthError;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for the authentication service.
///
/// Secrets are passed in explicitly; nothing here is read from
/// process-wide state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens (at least 32 bytes).
    pub token_secret: String,
    /// Token issuer (`iss` claim).
    pub token_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 86_400 = 24 hours).
    pub refresh_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
}

impl AuthConfig {
    pub fn access_token_ttl(&self) -> Result<Duration, AuthError> {
        lifetime("access_token_lifetime_secs", self.access_token_lifetime_secs)
    }

    pub fn refresh_token_ttl(&self) -> Result<Duration, AuthError> {
        lifetime("refresh_token_lifetime_secs", self.refresh_token_lifetime_secs)
    }

    /// Reject lifetimes outside `1..=MAX_TOKEN_LIFETIME_SECS`.
    pub fn check(&self) -> Result<(), AuthError> {
        self.access_token_ttl()?;
        self.refresh_token_ttl()?;
        Ok(())
    }
}

fn lifetime(field: &str, secs: u64) -> Result<Duration, AuthError> {
    let out_of_range = || {
        AuthError::InvalidConfig(format!(
            "{field} must be between 1 and {MAX_TOKEN_LIFETIME_SECS}, got {secs}"
        ))
    };
    if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&secs) {
        return Err(out_of_range());
    }
    let secs = i64::try_from(secs).map_err(|_| out_of_range())?;
    Duration::try_seconds(secs).ok_or_else(out_of_range)
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_issuer: "mybank".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 86_400,
            pepper: None,
            min_password_length: 6,
        }
    }
}
