use std::sync::Arc;

use axum::{
    extract::{Extension, OriginalUri},
    http::{Method, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::app::errors::json_error;
use crate::app::services::AppServices;
use crate::config::Environment;

pub async fn root(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(environment): Extension<Environment>,
) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Albiero Backend API is running",
        "environment": environment.as_str(),
        "database": services.db.state(),
    }))
}

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Server is healthy",
        "database": services.db.state(),
        "timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> Response {
    json_error(
        StatusCode::NOT_FOUND,
        format!("Route {method} {uri} not found"),
        None,
    )
}
