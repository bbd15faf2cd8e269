//! Persistence boundary for the two collections: users and leads.
//!
//! Each trait has an in-memory implementation (dev/test) and a Postgres one.
//! Handlers only ever see `Arc<dyn UserStore>` / `Arc<dyn LeadStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use albiero_auth::{ProfileUpdate, User, UserRecord};
use albiero_core::{Email, LeadId, UserId};
use albiero_leads::{Lead, LeadNote, LeadQuery, LeadUpdate, Page};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryLeadStore, InMemoryUserStore};
pub use postgres::{PgLeadStore, PgUserStore, SCHEMA};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique-email constraint hit.
    #[error("a user with this email already exists")]
    DuplicateEmail,

    /// The backing store cannot be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped back into a domain value.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("store query failed: {0}")]
    Query(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `DuplicateEmail` if the email is taken.
    async fn insert(&self, record: UserRecord) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Fetch several users at once; unknown ids are skipped.
    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// Like `find_by_email`, but including the password hash.
    async fn find_credentials(&self, email: &Email) -> Result<Option<UserRecord>, StoreError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn set_active(
        &self,
        id: UserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// All users, newest first.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn insert(&self, lead: Lead) -> Result<Lead, StoreError>;

    async fn get(&self, id: LeadId) -> Result<Option<Lead>, StoreError>;

    /// Filtered page, newest first.
    async fn query(&self, query: &LeadQuery) -> Result<Page<Lead>, StoreError>;

    async fn update(
        &self,
        id: LeadId,
        update: &LeadUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError>;

    /// Append a note atomically. Returns `None` if the lead does not exist.
    async fn add_note(&self, id: LeadId, note: LeadNote) -> Result<Option<Lead>, StoreError>;
}
