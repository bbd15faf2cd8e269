//! Infrastructure layer: persistence, connection lifecycle, credentials.

pub mod credentials;
pub mod database;
pub mod store;

pub use credentials::{CredentialError, CredentialService};
pub use database::{ConnectionState, Database, RetryPolicy};
pub use store::{
    InMemoryLeadStore, InMemoryUserStore, LeadStore, PgLeadStore, PgUserStore, StoreError,
    UserStore,
};
