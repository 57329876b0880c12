//! End-to-end tests of the customer router over in-memory stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use customer_service::{CustomerService, build_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use storefront_testing::{InMemoryCustomerStore, InMemorySessionStore, test_clock};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    let service = CustomerService::new(
        Arc::new(InMemoryCustomerStore::new()),
        Arc::new(InMemorySessionStore::new()),
        Arc::new(test_clock()),
        Duration::from_secs(3600),
    );
    build_router(service, Duration::from_secs(5))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
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

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn customer_body(email: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "password": "analytical",
        "phones": ["5551234567"],
        "addresses": [{ "city": "Springfield", "state": "IL", "zip_code": "62701" }]
    })
}

async fn register(app: &Router, email: &str) -> (String, String) {
    let (status, created) = send(app, Method::POST, "/customer", None, Some(customer_body(email))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (status, login) = send(
        app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": email, "password": "analytical" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");

    (
        created["id"].as_str().unwrap().to_string(),
        login["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_login_verify() {
    let app = app();
    let (id, token) = register(&app, "ada@example.com").await;

    let (status, verified) = send(&app, Method::GET, "/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["customer_id"], id);
    assert_eq!(verified["role"], "non-premium");

    let (status, customer) = send(&app, Method::GET, &format!("/customer/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customer["email"], "ada@example.com");
    assert!(customer.get("password_hash").is_none());
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = app();
    register(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "guessing!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, Method::GET, "/verify", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/verify", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = app();
    register(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/customer",
        None,
        Some(customer_body("ada@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let app = app();
    let mut body = customer_body("ada@example.com");
    body["password"] = json!("short");

    let (status, body) = send(&app, Method::POST, "/customer", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = send(&app, Method::GET, "/customer/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updates_require_owner_and_tier_changes_require_admin() {
    let app = app();
    let (ada, ada_token) = register(&app, "ada@example.com").await;
    let (_, grace_token) = register(&app, "grace@example.com").await;
    let path = format!("/customer/{ada}");

    let (status, _) = send(&app, Method::PUT, &path, None, Some(json!({ "first_name": "Augusta" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        &path,
        Some(&grace_token),
        Some(json!({ "first_name": "Augusta" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &path,
        Some(&ada_token),
        Some(json!({ "first_name": "Augusta" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["first_name"], "Augusta");
    assert_eq!(updated["last_name"], "Lovelace");

    let (status, _) = send(&app, Method::PUT, &path, Some(&ada_token), Some(json!({ "role": "premium" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_removes_customer_and_sessions() {
    let app = app();
    let (id, token) = register(&app, "ada@example.com").await;
    let path = format!("/customer/{id}");

    let (status, body) = send(&app, Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Customer deleted successfully");

    let (status, _) = send(&app, Method::GET, &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, &format!("/customer/{}", Uuid::new_v4()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_pages() {
    let app = app();
    let mut token = String::new();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        token = register(&app, email).await.1;
    }

    let (status, page) = send(&app, Method::GET, "/customer/list?page=1&limit=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"].as_array().unwrap().len(), 2);

    let (_, page) = send(&app, Method::GET, "/customer/list?page=abc&limit=0", Some(&token), None).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn listing_requires_a_session() {
    let app = app();
    register(&app, "ada@example.com").await;

    let (status, body) = send(&app, Method::GET, "/customer/list", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(!body.to_string().contains("ada@example.com"));

    let (status, _) = send(&app, Method::GET, "/customers", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lookup_by_email() {
    let app = app();
    let (id, token) = register(&app, "ada@example.com").await;

    let (status, customer) = send(&app, Method::GET, "/customer/email/ada@example.com", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customer["id"], id);
    assert!(customer.get("password_hash").is_none());

    let (status, _) = send(&app, Method::GET, "/customer/email/ada@example.com", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::GET, "/customer/email/not-an-email", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, body) = send(&app, Method::GET, "/customer/email/grace@example.com", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
