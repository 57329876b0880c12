//! Axum middleware for request tracking and authentication.
//!
//! This module provides:
//! - **Correlation ID tracking**: extract or generate `X-Correlation-ID`, open a
//!   tracing span for the request and echo the ID on the response
//! - **Authentication**: resolve the caller's identity and tier through an
//!   [`Authenticator`] and store it in request extensions
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state};
//! use storefront_web::middleware::{authenticate, correlation_id_layer};
//!
//! let app = Router::new()
//!     .route("/order/:id", get(get_order))
//!     .layer(from_fn_with_state(authenticator, authenticate))
//!     .layer(correlation_id_layer());
//! ```

use crate::error::AppError;
use crate::extractors::{AuthContext, Credential};
use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use storefront_core::ServiceError;
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

tokio::task_local! {
    static CORRELATION_ID: Uuid;
}

/// Correlation ID of the request being handled on this task, if any.
///
/// Set for the whole duration of a request by [`correlation_id_layer`].
#[must_use]
pub fn current_correlation_id() -> Option<Uuid> {
    CORRELATION_ID.try_with(|id| *id).ok()
}

/// Create a layer that adds correlation ID tracking to all requests.
///
/// This layer:
/// - Extracts correlation ID from request header or generates new UUID
/// - Stores correlation ID in request extensions
/// - Scopes it for error bodies produced while the request runs
/// - Creates tracing span with `correlation_id` field
/// - Injects correlation ID into response header
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = CORRELATION_ID
                .scope(correlation_id, fut.instrument(span))
                .await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Resolves a raw `Authorization` header value into an [`AuthContext`].
pub trait Authenticator: Send + Sync {
    /// Authenticates a credential.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthorized`]: the credential is not valid
    /// - [`ServiceError::DependencyFailure`]: the identity provider is unreachable
    fn authenticate<'a>(
        &'a self,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<AuthContext, ServiceError>>;
}

/// Lenient authentication middleware.
///
/// Requests without an `Authorization` header continue anonymously; handlers
/// that need a caller extract [`AuthContext`] and reject them. A header that is
/// present but not accepted by the [`Authenticator`] rejects the request.
///
/// # Errors
///
/// Returns [`AppError`] (401, or 502 when the identity provider is down).
pub async fn authenticate(
    State(authenticator): State<Arc<dyn Authenticator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(next.run(req).await);
    };

    let raw = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Malformed authorization header"))?
        .to_string();

    let context = authenticator.authenticate(&raw).await?;
    tracing::debug!(user_id = %context.user_id, tier = %context.tier, "Caller authenticated");

    req.extensions_mut().insert(context);
    req.extensions_mut().insert(Credential(raw));
    Ok(next.run(req).await)
}
