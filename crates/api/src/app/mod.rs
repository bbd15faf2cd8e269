//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, credential and token services, database handle
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: the response envelope and error mapping

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    Extension, Router,
};
use tower::ServiceBuilder;

use crate::config::Environment;
use crate::{authz, middleware};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{build_services, AppServices};

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>, environment: Environment) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.tokens.clone(),
        users: services.users.clone(),
    };

    // Layers added later run first: authenticate, then the role guard.
    let protected = Router::new()
        .merge(routes::authenticated_router())
        .merge(routes::admin_router().route_layer(from_fn(authz::require_admin)))
        .route_layer(from_fn_with_state(auth_state, middleware::authenticate));

    let api = Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .route_layer(from_fn_with_state(services.db.clone(), middleware::readiness));

    Router::new()
        .merge(routes::system_router())
        .merge(api)
        .fallback(routes::system::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::log_requests))
                .layer(from_fn(errors::method_not_allowed))
                .layer(from_fn_with_state(environment, errors::expose_error_detail))
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(services))
                .layer(Extension(environment)),
        )
}
