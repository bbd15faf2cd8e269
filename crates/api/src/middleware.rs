use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use albiero_auth::{admit, verify_bearer, TokenService};
use albiero_infra::{Database, UserStore};

use crate::app::errors::ApiError;
use crate::context::AuthenticatedUser;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenService>,
    pub users: Arc<dyn UserStore>,
}

/// Resolve the bearer token to an active user and attach it to the request.
///
/// Every authentication failure renders the same 401; the reason is logged
/// by `ApiError`.
pub async fn authenticate(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let user_id = verify_bearer(state.tokens.as_ref(), header, Utc::now())?;
    let user = admit(state.users.get(user_id).await?)?;

    req.extensions_mut().insert(AuthenticatedUser::new(user));
    Ok(next.run(req).await)
}

/// Fail fast with 503 while the database is not connected.
pub async fn readiness(
    State(db): State<Database>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    db.ensure_ready()?;
    Ok(next.run(req).await)
}

pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}
