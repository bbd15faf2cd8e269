//! `albiero-auth`: identity, credentials and access policy.
//!
//! This crate is decoupled from HTTP and storage: it mints and verifies
//! tokens, hashes and checks passwords, and decides whether an identity may
//! proceed. Looking identities up is the caller's job.

pub mod authenticate;
pub mod authorize;
pub mod claims;
pub mod password;
pub mod roles;
pub mod token;
pub mod user;

pub use authenticate::{admit, extract_bearer, verify_bearer, AuthnError};
pub use authorize::{require_role, AuthzError};
pub use claims::{validate_claims, TokenClaims, TokenValidationError};
pub use password::{hash_password, verify_password, PasswordError, PasswordHash};
pub use roles::Role;
pub use token::{Hs256TokenService, IssuedToken, TokenError, TokenService};
pub use user::{NewUser, ProfileUpdate, Registration, User, UserRecord, UserSummary};
