use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::Utc;

use albiero_auth::Registration;

use crate::app::dto;
use crate::app::errors::{respond, ApiError, ApiJson};
use crate::app::services::AppServices;
use crate::context::AuthenticatedUser;

pub fn public_router() -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

pub fn authenticated_router() -> Router {
    Router::new().route("/api/auth/me", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::RegisterRequest>,
) -> Result<Response, ApiError> {
    let new_user = Registration::from(body).validate()?;
    let now = Utc::now();

    let user = services.credentials.create(new_user, now).await?;
    let payload = services.session(user, now)?;

    tracing::info!(event = "auth.register", user_id = %payload.user.id, "user registered");
    Ok(respond(StatusCode::CREATED, Some("User registered successfully"), payload))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::LoginRequest>,
) -> Result<Response, ApiError> {
    let Some((email, password)) = body.credentials() else {
        return Err(ApiError::BadRequest("please provide email and password".to_string()));
    };
    let now = Utc::now();

    let user = services.credentials.login(&email, &password, now).await?;
    let payload = services.session(user, now)?;

    tracing::info!(event = "auth.login", user_id = %payload.user.id, "login succeeded");
    Ok(respond(StatusCode::OK, Some("Login successful"), payload))
}

pub async fn me(Extension(identity): Extension<AuthenticatedUser>) -> Response {
    respond(StatusCode::OK, None, identity.into_user())
}
