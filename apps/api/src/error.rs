//! # API Error Types
//!
//! Every failure leaves the server as `{"success": false, "message": "..."}`
//! with a matching status code.
//!
//! ## Status Mapping
//! ```text
//! ┌──────────────────────────────────────────┬────────┐
//! │ Error                                    │ Status │
//! ├──────────────────────────────────────────┼────────┤
//! │ Validation, EmptyCart, InsufficientStock │  400   │
//! │ CartTooLarge, malformed JSON             │  400   │
//! │ Missing / invalid bearer token           │  401   │
//! │ Forbidden (not owner, not admin)         │  403   │
//! │ Item / CartLine / Order not found        │  404   │
//! │ Request timed out                        │  408   │
//! │ Duplicate email                          │  409   │
//! │ Anything from the database               │  500   │
//! └──────────────────────────────────────────┴────────┘
//! ```
//!
//! Internal errors are logged with their detail and answered with a
//! generic message. [`expose_internal_detail`] puts the detail back into
//! the body when the server runs in dev mode.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use storefront_core::{CoreError, ValidationError};
use storefront_db::{DbError, StoreError};

use crate::response::ApiResponse;
use crate::state::AppState;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Request timed out")]
    Timeout,

    /// Carries the detail for logs; clients see a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }
}

/// Detail of a 500 response, kept in the response extensions so the
/// dev-mode layer can surface it.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            ApiError::Internal(detail) => {
                error!(detail = %detail, "Request failed with internal error");
                let mut response =
                    (status, ApiResponse::<()>::error(INTERNAL_MESSAGE)).into_response();
                response.extensions_mut().insert(InternalDetail(detail));
                response
            }
            other => (status, ApiResponse::<()>::error(other.to_string())).into_response(),
        }
    }
}

/// Response mapper installed on the router: in dev mode, replaces the
/// generic 500 message with the logged detail.
pub async fn expose_internal_detail(State(state): State<AppState>, response: Response) -> Response {
    if !state.config.server.dev_mode {
        return response;
    }

    match response.extensions().get::<InternalDetail>().cloned() {
        Some(InternalDetail(detail)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::<()>::error(format!("{}: {}", INTERNAL_MESSAGE, detail)),
        )
            .into_response(),
        None => response,
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ItemNotFound(_) | CoreError::CartLineNotFound(_) | CoreError::OrderNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            CoreError::Forbidden(_) => ApiError::Forbidden(err.to_string()),
            CoreError::EmptyCart
            | CoreError::InsufficientStock { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::Validation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(e) => e.into(),
            StoreError::Db(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(reason = %rejection.body_text(), "Rejected JSON body");
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
