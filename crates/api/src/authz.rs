//! API-side role guard.
//!
//! Runs after authentication, so the identity is already in the request
//! extensions. Its absence means the router was wired wrong.

use axum::{extract::Request, middleware::Next, response::Response};

use albiero_auth::{require_role, Role};

use crate::app::errors::ApiError;
use crate::context::AuthenticatedUser;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Check the current identity against `allowed`.
pub fn authorize(user: Option<&AuthenticatedUser>, allowed: &[Role]) -> Result<(), ApiError> {
    let user = user.ok_or_else(|| {
        ApiError::Internal("role guard ran without an authenticated identity".to_string())
    })?;
    require_role(user.user(), allowed)?;
    Ok(())
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    authorize(req.extensions().get::<AuthenticatedUser>(), ADMIN_ONLY)?;
    Ok(next.run(req).await)
}
