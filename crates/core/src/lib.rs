//! `albiero-core`: domain building blocks shared by every other crate.
//!
//! No IO and no framework types live here.

pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use email::Email;
pub use entity::{Entity, sort_newest_first};
pub use error::{DomainError, DomainResult, Validator};
pub use id::{LeadId, UserId};
pub use value_object::ValueObject;
