//! Credential handling on top of a [`UserStore`].
//!
//! Argon2 is deliberately slow, so hashing and verification run on the
//! blocking pool instead of stalling the async workers.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use thiserror::Error;

use albiero_auth::{hash_password, verify_password, NewUser, PasswordHash, User, UserRecord};
use albiero_core::{Email, ValueObject};

use crate::store::{StoreError, UserStore};

/// Verified against when the email is unknown, so that a miss costs about as
/// much as a wrong password. Only touched from the blocking pool.
static DECOY_HASH: LazyLock<Option<PasswordHash>> =
    LazyLock::new(|| hash_password("decoy-password-never-matches").ok());

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("a user with this email already exists")]
    DuplicateEmail,

    /// Unknown email, wrong password and disabled account all collapse here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CredentialError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => CredentialError::DuplicateEmail,
            other => CredentialError::Store(other),
        }
    }
}

#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserStore>,
}

impl CredentialService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Hash the password and persist a new user.
    pub async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User, CredentialError> {
        if self.find_by_email(&new_user.email).await?.is_some() {
            return Err(CredentialError::DuplicateEmail);
        }

        let password = new_user.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        // The unique index still decides races between concurrent registrations.
        let user = self.users.insert(UserRecord::create(&new_user, hash, now)).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        self.users.find_by_email(email).await
    }

    pub async fn find_credentials(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        self.users.find_credentials(email).await
    }

    pub async fn verify_secret(&self, candidate: &str, hash: &PasswordHash) -> Result<bool, CredentialError> {
        let candidate = candidate.to_owned();
        let hash = hash.clone();
        tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// Record a successful login. Failure is logged, never surfaced.
    pub async fn touch_last_login(&self, user: &mut User, at: DateTime<Utc>) {
        match self.users.touch_last_login(user.id, at).await {
            Ok(()) => {
                user.last_login = Some(at);
                user.updated_at = at;
            }
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "failed to record last login");
            }
        }
    }

    /// Check an email/password pair.
    ///
    /// Every rejection is `InvalidCredentials`; the actual reason only goes
    /// to the log.
    pub async fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<User, CredentialError> {
        let Ok(email) = Email::parse(email) else {
            return Err(CredentialError::InvalidCredentials);
        };

        let Some(record) = self.find_credentials(&email).await? else {
            self.verify_decoy(password).await?;
            tracing::info!(reason = "unknown_email", "login rejected");
            return Err(CredentialError::InvalidCredentials);
        };

        if !self.verify_secret(password, &record.password_hash).await? {
            tracing::info!(user_id = %record.user.id, reason = "wrong_password", "login rejected");
            return Err(CredentialError::InvalidCredentials);
        }
        if !record.user.is_active {
            tracing::info!(user_id = %record.user.id, reason = "disabled", "login rejected");
            return Err(CredentialError::InvalidCredentials);
        }

        let mut user = record.user;
        self.touch_last_login(&mut user, now).await;
        Ok(user)
    }

    async fn verify_decoy(&self, candidate: &str) -> Result<(), CredentialError> {
        let candidate = candidate.to_owned();
        tokio::task::spawn_blocking(move || {
            if let Some(decoy) = DECOY_HASH.as_ref() {
                let _ = verify_password(&candidate, decoy);
            }
        })
        .await
        .map_err(|e| CredentialError::Hashing(e.to_string()))
    }
}
