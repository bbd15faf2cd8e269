use albiero_auth::User;
use albiero_core::UserId;

/// The identity resolved by authentication for the current request.
///
/// Inserted as a request extension by the auth middleware; never contains
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    user: User,
}

impl AuthenticatedUser {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn id(&self) -> UserId {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn into_user(self) -> User {
        self.user
    }
}
