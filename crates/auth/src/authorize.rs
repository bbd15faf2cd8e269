use thiserror::Error;

use crate::{Role, User};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{actual}' is not allowed to perform this action")]
    Forbidden { actual: Role },
}

/// Allow the identity through only if its role is one of `allowed`.
///
/// Precondition: `user` was produced by authentication. Calling this without
/// an authenticated identity is a wiring bug, not a runtime case.
///
/// - No IO
/// - No panics
pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { actual: user.role })
    }
}
