//! End-to-end tests of the order router over in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use futures::future::BoxFuture;
use order_service::{AppState, RouterConfig, build_router, config::DEFAULT_PRICE_ROUTES};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::environment::Clock;
use storefront_core::{CustomerSnapshot, DiscountType, ServiceError, Tier};
use storefront_testing::{InMemoryOrderStore, MockCustomerLookup, fixtures, test_clock};
use storefront_web::{AuthContext, Authenticator, CORRELATION_ID_HEADER, RoleRoutes};
use tower::ServiceExt;
use uuid::Uuid;

/// Maps fixed bearer tokens to callers.
struct TokenTable(HashMap<String, AuthContext>);

impl Authenticator for TokenTable {
    fn authenticate<'a>(
        &'a self,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<AuthContext, ServiceError>> {
        Box::pin(async move {
            self.0
                .get(credential)
                .cloned()
                .ok_or_else(|| ServiceError::Unauthorized("unknown token".to_string()))
        })
    }
}

struct TestApp {
    router: Router,
    customer: CustomerSnapshot,
}

fn app_with(lookup: MockCustomerLookup, customer: CustomerSnapshot) -> TestApp {
    let mut tokens = HashMap::new();
    for tier in [Tier::premium(), Tier::non_premium(), Tier::admin()] {
        tokens.insert(
            format!("Bearer {tier}"),
            AuthContext {
                user_id: customer.id,
                tier,
            },
        );
    }

    let state = AppState::new(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(lookup),
        Arc::new(test_clock()),
    );
    let router = build_router(
        state,
        RouterConfig {
            authenticator: Arc::new(TokenTable(tokens)),
            price_routes: RoleRoutes::parse(DEFAULT_PRICE_ROUTES).unwrap(),
            request_timeout: Duration::from_secs(5),
            metrics: None,
        },
    );

    TestApp { router, customer }
}

fn app() -> TestApp {
    let customer = fixtures::customer_snapshot("premium");
    app_with(MockCustomerLookup::new().with_customer(customer.clone()), customer)
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn order_body(&self, discounts: Value) -> Value {
        json!({
            "customer_id": self.customer.id.to_string(),
            "items": [{
                "product_id": "sku-1",
                "product_name": "Lamp",
                "quantity": 2,
                "unit_price_cents": 5000
            }],
            "shipping_address": { "city": "Springfield", "state": "IL", "zip_code": "62701" },
            "billing_address": { "city": "Springfield", "state": "IL", "zip_code": "62701" },
            "discounts": discounts
        })
    }

    async fn create(&self, discounts: Value) -> String {
        let (status, body) = self
            .send(Method::POST, "/order", Some("premium"), Some(self.order_body(discounts)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn scenario_a_lifecycle_over_http() {
    let app = app();
    let id = app.create(json!([])).await;

    let (status, order) = app.send(Method::GET, &format!("/order/{id}"), Some("premium"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["total_price"], 10_000);
    assert_eq!(order["status"], "ORDERED");
    assert_eq!(order["customer"]["id"], app.customer.id.to_string());

    let (status, body) = app.send(Method::PATCH, &format!("/order/{id}/ship"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Order shipped successfully");

    let (status, _) = app.send(Method::PATCH, &format!("/order/{id}/deliver"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::DELETE, &format!("/order/cancel/{id}"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "STATE_CONFLICT");
    assert_eq!(body["message"], "Cannot cancel order while it is in 'DELIVERED' status.");
}

#[tokio::test]
async fn scenario_b_unknown_customer() {
    let customer = fixtures::customer_snapshot("premium");
    let app = app_with(MockCustomerLookup::new(), customer);

    let (status, body) = app
        .send(Method::POST, "/order", Some("premium"), Some(app.order_body(json!([]))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, list) = app.send(Method::GET, "/order/list", None, None).await;
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn customer_service_down_is_bad_gateway() {
    let customer = fixtures::customer_snapshot("premium");
    let app = app_with(MockCustomerLookup::unreachable(), customer);

    let (status, body) = app
        .send(Method::POST, "/order", Some("premium"), Some(app.order_body(json!([]))))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "DEPENDENCY_FAILURE");
}

#[tokio::test]
async fn scenario_c_and_d_role_routed_price() {
    let app = app();
    let now = test_clock().now();
    let discount = fixtures::discount("non-premium", DiscountType::Percentage, 20.0, now);
    let id = app.create(json!([serde_json::to_value(&discount).unwrap()])).await;

    // premium caller: the non-premium discount does not apply
    let (status, price) = app.send(Method::GET, &format!("/price/{id}"), Some("premium"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(price["tier"], "premium");
    assert_eq!(price["final_price"], price["original_price"]);
    assert_eq!(price["discount_applied"], 0);

    // non-premium caller reaches the other internal handler
    let (status, price) = app
        .send(Method::GET, &format!("/price/{id}"), Some("non-premium"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(price["tier"], "non-premium");
    assert_eq!(price["final_price"], 8_000);
    assert_eq!(price["discount_type"], "percentage");

    // unmapped tier
    let (status, body) = app.send(Method::GET, &format!("/price/{id}"), Some("admin"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // anonymous
    let (status, _) = app.send(Method::GET, &format!("/price/{id}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn internal_price_paths_are_not_public() {
    let app = app();
    let id = app.create(json!([])).await;

    let (status, _) = app
        .send(Method::GET, &format!("/internal/price/premium/{id}"), Some("premium"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_credential_is_unauthorized() {
    let app = app();
    let (status, body) = app.send(Method::GET, "/order/list", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn soft_delete_hides_order_from_listing() {
    let app = app();
    let kept = app.create(json!([])).await;
    let removed = app.create(json!([])).await;

    let (status, _) = app.send(Method::DELETE, &format!("/order/{removed}"), None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.send(Method::DELETE, &format!("/order/cancel/{removed}"), None, None).await;
    let (status, _) = app.send(Method::DELETE, &format!("/order/{removed}"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = app.send(Method::GET, "/order/list?page=0&limit=-5", None, None).await;
    let ids: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![kept.as_str()]);

    let (status, order) = app
        .send(Method::GET, &format!("/order/{removed}"), Some("premium"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["deleted"], true);
}

#[tokio::test]
async fn invalid_requests_are_bad_request() {
    let app = app();

    let (status, body) = app.send(Method::PATCH, "/order/not-a-uuid/ship", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let mut order = app.order_body(json!([]));
    order["items"] = json!([]);
    let (status, _) = app.send(Method::POST, "/order", Some("premium"), Some(order)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::POST, "/order", Some("premium"), Some(json!({ "items": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn concurrent_ship_requests_succeed_once() {
    let app = app();
    let id = app.create(json!([])).await;

    let path = format!("/order/{id}/ship");
    let attempts = (0..6).map(|_| app.send(Method::PATCH, &path, None, None));
    let statuses: Vec<StatusCode> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|(status, _)| status)
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(), 5);
}

#[tokio::test]
async fn responses_echo_correlation_id() {
    let app = app();
    let id = Uuid::new_v4();

    let request = Request::builder()
        .uri("/order/list")
        .header(CORRELATION_ID_HEADER, id.to_string())
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(CORRELATION_ID_HEADER).unwrap().to_str().unwrap(),
        id.to_string()
    );
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
