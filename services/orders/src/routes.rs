//! Router configuration for the order service.

use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    error_handling::HandleErrorLayer,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use storefront_web::{
    Authenticator, RoleRoutes, authenticate, correlation_id_layer, handle_middleware_error,
    handlers::health_check, panic_response, role_routed,
};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Everything the router needs besides the handler state.
pub struct RouterConfig {
    /// Resolves `Authorization` headers into callers
    pub authenticator: Arc<dyn Authenticator>,
    /// Tier → internal path table for `GET /price/:id`
    pub price_routes: RoleRoutes,
    /// Whole-request deadline
    pub request_timeout: Duration,
    /// Prometheus handle serving `GET /metrics`, if installed
    pub metrics: Option<PrometheusHandle>,
}

/// Tier-specific price handlers. Never merged into the public router.
pub fn internal_price_router(state: AppState) -> Router {
    Router::new()
        .route("/internal/price/premium/:id", get(handlers::premium_price))
        .route("/internal/price/non-premium/:id", get(handlers::non_premium_price))
        .with_state(state)
}

/// Build the complete order service router.
///
/// - `GET /health`, `GET /metrics`: unauthenticated
/// - `/order…`, `GET /price/:id`: behind the authentication middleware
///
/// Outermost first, every request passes correlation ID tracking, tracing,
/// panic recovery and the request deadline.
pub fn build_router(state: AppState, config: RouterConfig) -> Router {
    let api = Router::new()
        .route("/order", post(handlers::create_order))
        .route("/order/list", get(handlers::list_orders))
        .route(
            "/order/:id",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route("/order/:id/ship", patch(handlers::ship_order))
        .route("/order/:id/deliver", patch(handlers::deliver_order))
        .route("/order/cancel/:id", delete(handlers::cancel_order))
        .with_state(state.clone())
        .merge(role_routed(
            "/price/:id",
            config.price_routes,
            internal_price_router(state),
        ))
        .layer(from_fn_with_state(config.authenticator, authenticate));

    let mut router = Router::new().route("/health", get(health_check));
    if let Some(handle) = config.metrics {
        router = router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    router
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
