//! Request authentication steps.
//!
//! The full pipeline is extract → verify → resolve → admit. Resolution needs
//! a store, so it happens in the caller between `verify_bearer` and `admit`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use albiero_core::UserId;

use crate::{TokenService, User};

/// Why a request failed authentication.
///
/// The variants exist for logging. Callers must render all of them the same
/// way so clients cannot tell a bad signature from a disabled account.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthnError {
    #[error("no bearer credential presented")]
    MissingCredential,

    #[error("credential failed verification")]
    InvalidCredential,

    #[error("credential subject does not exist")]
    UnknownIdentity,

    #[error("identity is disabled")]
    IdentityDisabled,
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthnError> {
    let header = header.ok_or(AuthnError::MissingCredential)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthnError::MissingCredential)?;

    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthnError::MissingCredential);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthnError::MissingCredential);
    }

    Ok(token)
}

/// Extract and verify the bearer token, yielding the asserted user id.
pub fn verify_bearer(
    tokens: &dyn TokenService,
    header: Option<&str>,
    now: DateTime<Utc>,
) -> Result<UserId, AuthnError> {
    let token = extract_bearer(header)?;
    let claims = tokens
        .verify(token, now)
        .map_err(|_| AuthnError::InvalidCredential)?;
    Ok(claims.sub)
}

/// Final gate on the identity the token resolved to.
pub fn admit(resolved: Option<User>) -> Result<User, AuthnError> {
    let user = resolved.ok_or(AuthnError::UnknownIdentity)?;
    if !user.is_active {
        return Err(AuthnError::IdentityDisabled);
    }
    Ok(user)
}
