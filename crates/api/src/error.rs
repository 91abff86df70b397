//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use orders::OrderError;
use serde::Serialize;
use store::StoreError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The caller could not be identified.
    Unauthorized(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The caller is not allowed to do this.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// The resource changed under the request.
    Conflict(String),
    /// Internal server error; the detail is logged, never returned.
    Internal(String),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                INTERNAL_MESSAGE.to_string()
            }
            ApiError::Unauthorized(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg,
        };

        let body = ErrorBody {
            success: false,
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { .. } | StoreError::StockOverflow { .. } => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(_) | CatalogError::AlreadyExists(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CatalogError::Forbidden(msg) => ApiError::Forbidden(msg),
            CatalogError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CatalogError::Store(e) => e.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(_)
            | OrderError::InsufficientStock { .. }
            | OrderError::NotCancellable { .. } => ApiError::BadRequest(err.to_string()),
            OrderError::Forbidden(msg) => ApiError::Forbidden(msg),
            OrderError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            OrderError::InvalidTransition(_) | OrderError::ConcurrentUpdate { .. } => {
                ApiError::Conflict(err.to_string())
            }
            OrderError::OrderNumberExhausted { .. } => ApiError::Internal(err.to_string()),
            OrderError::Store(e) => e.into(),
        }
    }
}
