//! Access-token minting and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use albiero_core::UserId;

use crate::claims::{validate_claims, TokenClaims, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, or not a JWT at all.
    #[error("malformed or badly signed token")]
    Invalid,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// A freshly minted token plus its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens.
///
/// Both operations take `now` explicitly; there is no hidden clock and no
/// state beyond the signing key.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken, TokenError>;

    /// Verify signature and validity window, returning the claims.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

/// HMAC-SHA256 signed JWTs with a fixed time-to-live.
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the caller's `now`.
        validation.validate_exp = false;
        validation.required_spec_claims = ["exp", "sub"].into_iter().map(String::from).collect();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService for Hs256TokenService {
    fn issue(&self, user_id: UserId, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = TokenClaims::new(user_id, now, self.ttl);
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| TokenError::Encoding("expiry out of range".to_string()))?;

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| TokenError::Invalid)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
