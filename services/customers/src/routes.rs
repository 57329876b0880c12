//! Router configuration for the customer service.

use crate::auth::SessionAuthenticator;
use crate::handlers;
use crate::service::CustomerService;
use axum::{
    Router,
    error_handling::HandleErrorLayer,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use storefront_web::{
    Authenticator, authenticate, correlation_id_layer, handle_middleware_error,
    handlers::health_check, panic_response,
};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Build the complete customer service router.
///
/// Updates, deletes, the customer list and the e-mail lookup need a session;
/// everything else is open.
pub fn build_router(service: CustomerService, request_timeout: Duration) -> Router {
    let authenticator: Arc<dyn Authenticator> = Arc::new(SessionAuthenticator::new(service.clone()));

    let api = Router::new()
        .route("/customer", post(handlers::create_customer))
        .route(
            "/customer/:id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route("/customer/list", get(handlers::list_customers))
        .route("/customer/email/:email", get(handlers::get_customer_by_email))
        .route("/login", post(handlers::login))
        .route("/verify", get(handlers::verify))
        .with_state(service)
        .layer(from_fn_with_state(authenticator, authenticate));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
