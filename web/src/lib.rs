//! Axum integration shared by the storefront services.
//!
//! Services keep their business rules in `storefront-core` types and use this
//! crate for the HTTP shell around them:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            HTTP shell (Axum)            │  ← correlation IDs, auth,
//! │  - extractors, error mapping            │    role-based dispatch
//! ├─────────────────────────────────────────┤
//! │            Service logic                │  ← OrderLifecycle, PricingResolver,
//! │  - validation, state machine            │    CustomerService
//! ├─────────────────────────────────────────┤
//! │            Stores / clients             │  ← Postgres, in-memory, HTTP
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use storefront_web::{AppError, Credential, correlation_id_layer};
//! use axum::{Router, routing::get, extract::{Path, State}, Json};
//!
//! async fn get_order(
//!     State(lifecycle): State<Arc<OrderLifecycle>>,
//!     Path(id): Path<OrderId>,
//!     credential: Credential,
//! ) -> Result<Json<OrderView>, AppError> {
//!     Ok(Json(lifecycle.get_by_id(id, credential.as_str()).await?))
//! }
//!
//! let app = Router::new()
//!     .route("/order/:id", get(get_order))
//!     .with_state(lifecycle)
//!     .layer(correlation_id_layer());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod role_router;

pub use error::{AppError, handle_middleware_error, panic_response};
pub use extractors::{AuthContext, BearerToken, CorrelationId, Credential};
pub use middleware::{
    Authenticator, CORRELATION_ID_HEADER, authenticate, correlation_id_layer,
    current_correlation_id,
};
pub use role_router::{RoleRoutes, RoleRoutesError, role_routed};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
