use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;

use albiero_auth::ProfileUpdate;

use crate::app::dto;
use crate::app::errors::{respond, ApiError, ApiJson};
use crate::app::services::AppServices;
use crate::context::AuthenticatedUser;

/// Self-service routes, open to any authenticated user.
pub fn router() -> Router {
    Router::new().route("/api/users/profile", get(get_profile).put(update_profile))
}

pub fn admin_router() -> Router {
    Router::new().route("/api/users", get(list_users))
}

pub async fn get_profile(Extension(identity): Extension<AuthenticatedUser>) -> Response {
    respond(StatusCode::OK, None, identity.into_user())
}

pub async fn update_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<AuthenticatedUser>,
    ApiJson(body): ApiJson<dto::ProfileRequest>,
) -> Result<Response, ApiError> {
    let update = ProfileUpdate::from(body).validate()?;
    if update.is_empty() {
        return Ok(respond(StatusCode::OK, Some("Profile updated successfully"), identity.into_user()));
    }

    let user = services
        .users
        .update_profile(identity.id(), &update, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    tracing::info!(event = "users.profile_updated", user_id = %user.id, "profile updated");
    Ok(respond(StatusCode::OK, Some("Profile updated successfully"), user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let users = services.users.list().await?;
    Ok(respond(StatusCode::OK, None, users))
}
