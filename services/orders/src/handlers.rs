//! HTTP handlers for the order endpoints.
//!
//! Request bodies are tagged structs converted into domain drafts here, so the
//! engine never sees raw JSON.

use crate::lifecycle::OrderView;
use crate::pricing::FinalPrice;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{
    Address, CustomerId, Discount, DiscountType, LineItem, Money, NewOrder, Order, OrderId,
    Pagination, ServiceError, Tier,
};
use storefront_web::{AppError, Credential, WebResult};
use uuid::Uuid;

/// `POST /order` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    /// Ordering customer (UUID)
    pub customer_id: String,
    /// Line items, at least one
    pub items: Vec<LineItemRequest>,
    /// Where to ship
    pub shipping_address: Address,
    /// Where to bill
    pub billing_address: Address,
    /// Discount terms to attach
    #[serde(default)]
    pub discounts: Vec<DiscountRequest>,
}

/// One line of a [`CreateOrderRequest`].
#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
    /// Product identifier
    pub product_id: String,
    /// Product display name
    pub product_name: String,
    /// Units ordered
    pub quantity: i64,
    /// Price per unit in cents
    pub unit_price_cents: i64,
}

/// One discount of a [`CreateOrderRequest`].
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRequest {
    /// Identifier, generated when absent
    pub id: Option<String>,
    /// Tier the discount applies to
    pub tier: Tier,
    /// Start of the validity window (inclusive)
    pub starts_at: DateTime<Utc>,
    /// End of the validity window (exclusive)
    pub ends_at: DateTime<Utc>,
    /// Promotion code
    pub code: Option<String>,
    /// `percentage` or `fixed-amount`
    #[serde(rename = "type")]
    pub kind: DiscountType,
    /// Percent, or cents for fixed amounts
    pub value: f64,
}

impl CreateOrderRequest {
    /// Converts the request into a draft.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] for a malformed customer id or a
    /// quantity that is not a positive count.
    pub fn into_draft(self) -> Result<NewOrder, ServiceError> {
        let customer_id = self.customer_id.parse::<CustomerId>()?;

        let items = self
            .items
            .into_iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity).map_err(|_| {
                    ServiceError::InvalidInput(format!(
                        "quantity of '{}' must be between 1 and {}",
                        item.product_id,
                        u32::MAX
                    ))
                })?;
                Ok(LineItem::new(
                    item.product_id,
                    item.product_name,
                    quantity,
                    Money::from_cents(item.unit_price_cents),
                ))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let discounts = self
            .discounts
            .into_iter()
            .map(|d| Discount {
                id: d.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                tier: d.tier,
                starts_at: d.starts_at,
                ends_at: d.ends_at,
                code: d.code,
                kind: d.kind,
                value: d.value,
            })
            .collect();

        Ok(NewOrder {
            customer_id,
            items,
            shipping_address: self.shipping_address,
            billing_address: self.billing_address,
            discounts,
        })
    }
}

/// `GET /order/list` query.
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
    /// New order id
    pub id: OrderId,
}

/// Confirmation body of state-changing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// Body of `GET /order/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// The page of orders
    pub data: Vec<Order>,
}

fn order_id(raw: &str) -> Result<OrderId, AppError> {
    Ok(raw.parse::<OrderId>()?)
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// `POST /order`
///
/// # Errors
///
/// Returns [`AppError`] for invalid bodies, unknown customers or an
/// unreachable customer service.
pub async fn create_order(
    State(state): State<AppState>,
    credential: Credential,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<CreatedResponse>)> {
    let draft = json_body(body)?.into_draft()?;
    let id = state.lifecycle.create(draft, credential.as_str()).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /order/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders or customers.
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    credential: Credential,
) -> WebResult<Json<OrderView>> {
    let view = state.lifecycle.get_by_id(order_id(&id)?, credential.as_str()).await?;
    Ok(Json(view))
}

/// `PATCH /order/:id/ship`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders or invalid transitions.
pub async fn ship_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.lifecycle.ship(order_id(&id)?).await?;
    Ok(MessageResponse::new("Order shipped successfully"))
}

/// `PATCH /order/:id/deliver`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders or invalid transitions.
pub async fn deliver_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.lifecycle.deliver(order_id(&id)?).await?;
    Ok(MessageResponse::new("Order delivered successfully"))
}

/// `DELETE /order/cancel/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders or invalid transitions.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.lifecycle.cancel(order_id(&id)?).await?;
    Ok(MessageResponse::new(
        "Order cancelled successfully. The order is now inactive.",
    ))
}

/// `DELETE /order/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders or orders not yet delivered or canceled.
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<MessageResponse>> {
    state.lifecycle.delete_softly(order_id(&id)?).await?;
    Ok(MessageResponse::new("Order deleted successfully"))
}

/// `GET /order/list?page=&limit=`
///
/// # Errors
///
/// Returns [`AppError`] if the store fails.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> WebResult<Json<ListResponse>> {
    let page = Pagination::parse(params.page.as_deref(), params.limit.as_deref());
    let data = state.lifecycle.list_all(page).await?;
    Ok(Json(ListResponse { data }))
}

/// `GET /internal/price/premium/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders.
pub async fn premium_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<FinalPrice>> {
    price_for(&state, &id, &Tier::premium()).await
}

/// `GET /internal/price/non-premium/:id`
///
/// # Errors
///
/// Returns [`AppError`] for unknown orders.
pub async fn non_premium_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<Json<FinalPrice>> {
    price_for(&state, &id, &Tier::non_premium()).await
}

async fn price_for(state: &AppState, id: &str, tier: &Tier) -> WebResult<Json<FinalPrice>> {
    let price = state.pricing.compute_final_price(order_id(id)?, tier).await?;
    Ok(Json(price))
}
