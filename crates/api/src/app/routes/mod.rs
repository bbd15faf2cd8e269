use axum::{routing::get, Router};

pub mod auth;
pub mod leads;
pub mod system;
pub mod users;

/// Endpoints that never touch the stores.
pub fn system_router() -> Router {
    Router::new()
        .route("/", get(system::root))
        .route("/api/health", get(system::health))
}

/// Endpoints open to anonymous callers.
pub fn public_router() -> Router {
    Router::new()
        .merge(auth::public_router())
        .merge(leads::public_router())
}

/// Endpoints for any authenticated identity.
pub fn authenticated_router() -> Router {
    Router::new()
        .merge(auth::authenticated_router())
        .merge(users::router())
}

/// Endpoints restricted to administrators.
pub fn admin_router() -> Router {
    Router::new()
        .merge(users::admin_router())
        .merge(leads::admin_router())
}
