use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use albiero_core::UserId;

/// JWT claims carried by an access token.
///
/// Only the subject and the validity window are asserted. Role and status are
/// always re-read from the store, so a demoted or disabled user loses access
/// immediately even while holding an unexpired token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the user the token was issued to.
    pub sub: UserId,

    /// Issued-at, Unix seconds.
    pub iat: i64,

    /// Expiry, Unix seconds. The token is valid strictly before this instant.
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(sub: UserId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub,
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Check the claims' validity window against `now`.
///
/// Signature verification happens in [`crate::token`]; this is the pure time
/// check, valid for `iat <= now < exp`.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
