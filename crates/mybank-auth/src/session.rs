//! Refresh-session validation.
//!
//! A session is Active while it is neither blocked nor expired. The
//! checks below run in a fixed order and stop at the first failure, so
//! the reported reason is deterministic when several conditions hold.

use chrono::{DateTime, Utc};
use mybank_core::models::session::Session;

use crate::token::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    Blocked,
    UserMismatch,
    TokenMismatch,
    Expired,
}

impl std::fmt::Display for SessionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            SessionRejection::Blocked => "session is blocked",
            SessionRejection::UserMismatch => "session user mismatch",
            SessionRejection::TokenMismatch => "session token mismatch",
            SessionRejection::Expired => "session expired",
        };
        f.write_str(reason)
    }
}

/// Decide whether `presented` (already signature-verified into
/// `payload`) may mint a new access token against `session`.
pub fn check_session(
    session: &Session,
    payload: &Payload,
    presented: &str,
    now: DateTime<Utc>,
) -> Result<(), SessionRejection> {
    if session.is_blocked {
        return Err(SessionRejection::Blocked);
    }
    if session.username != payload.username {
        return Err(SessionRejection::UserMismatch);
    }
    if session.refresh_token != presented {
        return Err(SessionRejection::TokenMismatch);
    }
    if now > session.expires_at {
        return Err(SessionRejection::Expired);
    }
    Ok(())
}
