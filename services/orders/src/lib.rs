//! # Order Service
//!
//! Orders over HTTP, with every operation checked against the customer
//! service.
//!
//! - [`lifecycle`]: the order state machine and its orchestration
//! - [`pricing`]: tier-based final price computation
//! - [`lookup`]: the bounded-timeout customer service client
//! - [`routes`]: the public router, including the role-routed `GET /price/:id`
//!
//! ## Example
//!
//! ```ignore
//! let state = AppState::new(store, lookup, Arc::new(SystemClock));
//! let app = build_router(state, RouterConfig { authenticator, price_routes, request_timeout, metrics: None });
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod lookup;
pub mod metrics;
pub mod pricing;
pub mod routes;
pub mod state;

pub use auth::CustomerServiceAuthenticator;
pub use config::{Config, ConfigError};
pub use lifecycle::{OrderLifecycle, OrderView};
pub use lookup::{HttpCustomerLookup, Verification};
pub use pricing::{FinalPrice, PricingResolver};
pub use routes::{RouterConfig, build_router, internal_price_router};
pub use state::AppState;
