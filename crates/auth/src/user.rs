//! User identity model.
//!
//! `User` is the public shape of an identity and is safe to serialize. The
//! password hash only ever travels inside `UserRecord`, which has no
//! `Serialize` impl, so it cannot leak into a response by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use albiero_core::{DomainError, DomainResult, Email, Entity, UserId, Validator, ValueObject};

use crate::{PasswordHash, Role};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const PASSWORD_MIN: usize = 6;

/// A registered identity, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: Email,
    pub role: Role,
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: Some(self.email.clone()),
        }
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Short reference to a user, embedded in lead views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
}

/// A user together with its password hash (login path only).
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: PasswordHash,
}

impl UserRecord {
    /// Build the record for a newly registered user. The plaintext password
    /// must already have been hashed into `password_hash`.
    pub fn create(new_user: &NewUser, password_hash: PasswordHash, now: DateTime<Utc>) -> Self {
        Self {
            user: User {
                id: UserId::new(),
                name: new_user.name.clone(),
                email: new_user.email.clone(),
                role: new_user.role,
                phone: new_user.phone.clone(),
                is_active: true,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            password_hash,
        }
    }
}

/// Raw registration input, as received.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
}

impl Registration {
    /// Validate every field, reporting all failures together.
    ///
    /// Self-registration always produces a `Role::User`.
    pub fn validate(self) -> DomainResult<NewUser> {
        let mut v = Validator::default();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default().to_string();
        v.check(
            name.chars().count() >= NAME_MIN,
            format!("name must be at least {NAME_MIN} characters"),
        );
        v.check(
            name.chars().count() <= NAME_MAX,
            format!("name must be at most {NAME_MAX} characters"),
        );

        let email = v.absorb(Email::parse(self.email.as_deref().unwrap_or_default()));

        let password = self.password.unwrap_or_default();
        v.check(
            password.chars().count() >= PASSWORD_MIN,
            format!("password must be at least {PASSWORD_MIN} characters"),
        );

        v.finish()?;
        let Some(email) = email else {
            return Err(DomainError::validation("email is required"));
        };

        Ok(NewUser {
            name,
            email,
            password,
            phone: normalize_phone(self.phone),
            role: Role::User,
        })
    }
}

/// Validated registration data. Holds the plaintext password until hashing.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Self-service profile changes. Only name and phone are editable; email and
/// role are immutable through this path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// `Some("")` clears the phone.
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(self) -> DomainResult<Self> {
        let mut v = Validator::default();
        let name = self.name.map(|n| n.trim().to_string());
        if let Some(name) = &name {
            v.check(
                name.chars().count() >= NAME_MIN,
                format!("name must be at least {NAME_MIN} characters"),
            );
            v.check(
                name.chars().count() <= NAME_MAX,
                format!("name must be at most {NAME_MAX} characters"),
            );
        }
        v.finish()?;

        Ok(Self {
            name,
            phone: self.phone.map(|p| p.trim().to_string()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }

    pub fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = normalize_phone(Some(phone.clone()));
        }
        user.updated_at = now;
    }
}

fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}
