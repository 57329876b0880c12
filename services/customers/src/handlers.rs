//! HTTP handlers for the customer endpoints.

use crate::service::{CustomerService, CustomerUpdate, LoginResponse, NewCustomer, VerifiedCustomer};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use storefront_core::{CustomerId, CustomerSnapshot, Pagination};
use storefront_web::{AppError, AuthContext, BearerToken, WebResult};

/// `POST /login` body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Login e-mail
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// `GET /customer/list` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// 1-based page, defaults to 1
    pub page: Option<String>,
    /// Page size, defaults to 10
    pub limit: Option<String>,
}

/// Body of `201 Created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// New customer id
    pub id: CustomerId,
}

/// Confirmation body of `DELETE /customer/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Body of `GET /customer/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// The page of customers
    pub data: Vec<CustomerSnapshot>,
}

fn customer_id(raw: &str) -> Result<CustomerId, AppError> {
    Ok(raw.parse::<CustomerId>()?)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// `POST /customer`
///
/// # Errors
///
/// Returns [`AppError`] for invalid bodies or a taken e-mail.
pub async fn create_customer(
    State(service): State<CustomerService>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> WebResult<(StatusCode, Json<CreatedResponse>)> {
    let id = service.create(json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /customer/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown customers.
pub async fn get_customer(
    State(service): State<CustomerService>,
    Path(id): Path<String>,
) -> WebResult<Json<CustomerSnapshot>> {
    Ok(Json(service.get(customer_id(&id)?).await?))
}

/// `PUT /customer/:id`
///
/// # Errors
///
/// Returns [`AppError`] for anonymous or unauthorized callers, unknown
/// customers and invalid changes.
pub async fn update_customer(
    State(service): State<CustomerService>,
    caller: AuthContext,
    Path(id): Path<String>,
    body: Result<Json<CustomerUpdate>, JsonRejection>,
) -> WebResult<Json<CustomerSnapshot>> {
    let id = customer_id(&id)?;
    let snapshot = service.update(&caller, id, json_body(body)?).await?;
    Ok(Json(snapshot))
}

/// `DELETE /customer/:id`
///
/// # Errors
///
/// Returns [`AppError`] for anonymous or unauthorized callers and unknown
/// customers.
pub async fn delete_customer(
    State(service): State<CustomerService>,
    caller: AuthContext,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    service.delete(&caller, customer_id(&id)?).await?;
    Ok(Json(MessageResponse {
        message: "Customer deleted successfully".to_string(),
    }))
}

/// `GET /customer/email/:email`
///
/// # Errors
///
/// Returns [`AppError`] for anonymous or unauthorized callers, malformed
/// e-mails and unknown customers.
pub async fn get_customer_by_email(
    State(service): State<CustomerService>,
    caller: AuthContext,
    Path(email): Path<String>,
) -> WebResult<Json<CustomerSnapshot>> {
    Ok(Json(service.get_by_email(&caller, &email).await?))
}

/// `GET /customer/list?page=&limit=`
///
/// # Errors
///
/// Returns [`AppError`] for anonymous or unauthorized callers and store
/// failures.
pub async fn list_customers(
    State(service): State<CustomerService>,
    caller: AuthContext,
    Query(params): Query<ListParams>,
) -> WebResult<Json<ListResponse>> {
    let page = Pagination::parse(params.page.as_deref(), params.limit.as_deref());
    Ok(Json(ListResponse {
        data: service.list(&caller, page).await?,
    }))
}

/// `POST /login`
///
/// # Errors
///
/// Returns [`AppError`] (401) for unknown e-mails or wrong passwords.
pub async fn login(
    State(service): State<CustomerService>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> WebResult<Json<LoginResponse>> {
    let LoginRequest { email, password } = json_body(body)?;
    Ok(Json(service.login(&email, &password).await?))
}

/// `GET /verify`
///
/// # Errors
///
/// Returns [`AppError`] (401) for missing, unknown or expired tokens.
pub async fn verify(
    State(service): State<CustomerService>,
    BearerToken(token): BearerToken,
) -> WebResult<Json<VerifiedCustomer>> {
    Ok(Json(service.verify(&token).await?))
}
