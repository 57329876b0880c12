//! Error types for web handlers.
//!
//! This module bridges [`ServiceError`] and HTTP responses. Every error body
//! has the same shape and echoes the correlation ID of the request:
//!
//! ```json
//! {
//!   "code": "STATE_CONFLICT",
//!   "message": "Cannot cancel order while it is in 'DELIVERED' status.",
//!   "correlation_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
//!   "timestamp": "2025-01-01T00:00:00Z"
//! }
//! ```

use crate::middleware::current_correlation_id;
use axum::{
    BoxError, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use storefront_core::ServiceError;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Order>, AppError> {
///     let order = engine.get_by_id(id, &credential).await?;
///     Ok(Json(order))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code of this error.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "INVALID_INPUT".to_string())
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED".to_string())
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN".to_string())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 408 Request Timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, message.into(), "TIMEOUT".to_string())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
    correlation_id: String,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let correlation_id = current_correlation_id()
            .map_or_else(|| "not-available".to_string(), |id| id.to_string());

        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    correlation_id = %correlation_id,
                    error = %format!("{source:#}"),
                    "Request failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    correlation_id = %correlation_id,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            correlation_id,
            timestamp: Utc::now(),
        };

        (self.status, Json(body)).into_response()
    }
}

/// Deterministic mapping from the domain taxonomy to HTTP.
impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code().to_string();
        match err {
            ServiceError::InvalidInput(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, code)
            }
            ServiceError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, err.to_string(), code)
            }
            ServiceError::StateConflict { .. } | ServiceError::AlreadyExists { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string(), code)
            }
            ServiceError::Unauthorized(message) => {
                Self::new(StatusCode::UNAUTHORIZED, message, code)
            }
            ServiceError::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, message, code),
            ServiceError::DependencyFailure(ref detail) => Self::new(
                StatusCode::BAD_GATEWAY,
                "A required service is unavailable".to_string(),
                code,
            )
            .with_source(anyhow::anyhow!("{detail}")),
            ServiceError::Internal(ref detail) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                code,
            )
            .with_source(anyhow::anyhow!("{detail}")),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Turns errors raised by fallible tower layers into [`AppError`]s.
///
/// Use with `axum::error_handling::HandleErrorLayer` in front of
/// `tower::timeout::TimeoutLayer`.
#[allow(clippy::unused_async)]
pub async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return AppError::timeout("Request took too long");
    }
    AppError::internal("An internal error occurred").with_source(anyhow::anyhow!("{err}"))
}

/// Response for a handler panic, for `tower_http::catch_panic::CatchPanicLayer::custom`.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(ToString::to_string))
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::internal("An internal error occurred")
        .with_source(anyhow::anyhow!("handler panicked: {detail}"))
        .into_response()
}
