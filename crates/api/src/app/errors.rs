use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request, State,
    },
    http::{header::ALLOW, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use albiero_auth::{AuthnError, AuthzError, TokenError};
use albiero_core::DomainError;
use albiero_infra::{CredentialError, StoreError};

use crate::config::Environment;

/// Response body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn respond<T: Serialize>(status: StatusCode, message: Option<&str>, data: T) -> Response {
    let body = Envelope {
        success: true,
        message: message.map(str::to_string),
        data: Some(data),
        errors: None,
        error: None,
    };
    (status, Json(body)).into_response()
}

pub fn json_error(status: StatusCode, message: impl Into<String>, errors: Option<Vec<String>>) -> Response {
    let body: Envelope<()> = Envelope {
        success: false,
        message: Some(message.into()),
        data: None,
        errors,
        error: None,
    };
    (status, Json(body)).into_response()
}

/// Server-side failure detail, carried on the response so that
/// [`expose_error_detail`] can decide whether the client gets to see it.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation errors")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("request body too large")]
    PayloadTooLarge,

    /// Token-based authentication failed. The reason is logged, not sent.
    #[error("invalid or missing credentials")]
    Unauthenticated(AuthnError),

    /// Email/password login failed.
    #[error("invalid credentials")]
    InvalidLogin,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database service temporarily unavailable")]
    Unavailable(String),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Unauthenticated(_) | ApiError::InvalidLogin => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            ApiError::Validation(errors) => json_error(status, "Validation errors", Some(errors)),
            ApiError::Unauthenticated(reason) => {
                tracing::warn!(reason = %reason, "request rejected: authentication");
                json_error(status, message, None)
            }
            ApiError::Forbidden(detail) => {
                tracing::warn!(detail = %detail, "request rejected: authorization");
                json_error(status, message, None)
            }
            ApiError::Unavailable(detail) => {
                tracing::error!(error = %detail, "store unavailable");
                json_error(status, message, None)
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                let mut response = json_error(status, message, None);
                response.extensions_mut().insert(ErrorDetail(detail));
                response
            }
            _ => json_error(status, message, None),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(messages) => ApiError::Validation(messages),
            DomainError::InvalidId(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                ApiError::BadRequest("a user with this email already exists".to_string())
            }
            StoreError::Unavailable(detail) => ApiError::Unavailable(detail),
            StoreError::Corrupt(_) | StoreError::Query(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::DuplicateEmail => StoreError::DuplicateEmail.into(),
            CredentialError::InvalidCredentials => ApiError::InvalidLogin,
            CredentialError::Store(e) => e.into(),
            CredentialError::Hashing(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<AuthnError> for ApiError {
    fn from(err: AuthnError) -> Self {
        ApiError::Unauthenticated(err)
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden { actual } => ApiError::Forbidden(format!(
                "Access denied. Role {actual} is not allowed to perform this action"
            )),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(format!("token issuance failed: {err}"))
    }
}

/// `Json` extractor whose rejections use the envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::PayloadTooLarge)
            }
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// `Query` extractor whose rejections use the envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
    }
}

/// Give the router's bodyless 405 the envelope, keeping its `Allow` header.
pub async fn method_not_allowed(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let response = next.run(req).await;
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(ALLOW).cloned();
    let mut rendered = json_error(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {method} not allowed on {path}"),
        None,
    );
    if let Some(allow) = allow {
        rendered.headers_mut().insert(ALLOW, allow);
    }
    rendered
}

/// In development, re-render 500s with the underlying detail in `error`.
/// Production responses keep the generic message only.
pub async fn expose_error_detail(
    State(environment): State<Environment>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;
    if environment.is_production() || response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let body: Envelope<()> = Envelope {
        success: false,
        message: Some(ApiError::Internal(String::new()).to_string()),
        data: None,
        errors: None,
        error: Some(detail),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
