//! Order documents.

use crate::{database_error, limit_offset};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::PgPool;
use sqlx::types::JsonValue;
use storefront_core::store::{OrderStore, UpdateOutcome};
use storefront_core::{Order, OrderId, OrderStatus, Pagination, StoreError};

type OrderRow = (JsonValue, String, bool, DateTime<Utc>);

const FIND_BY_ID: &str = "SELECT document, status, deleted, updated_at FROM orders WHERE id = $1";

const LIST_VISIBLE: &str = r"
    SELECT document, status, deleted, updated_at
    FROM orders
    WHERE NOT deleted
    ORDER BY created_at DESC, id
    LIMIT $1 OFFSET $2
";

/// `PostgreSQL`-backed [`OrderStore`].
///
/// Status changes are a single `UPDATE … WHERE id = $1 AND status = $2`
/// statement, so two racing transitions cannot both apply.
#[derive(Clone, Debug)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(row: OrderRow) -> Result<Order, StoreError> {
    let (document, status, deleted, updated_at) = row;
    let mut order: Order = serde_json::from_value(document)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    order.status = status
        .parse::<OrderStatus>()
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    order.deleted = deleted;
    order.updated_at = updated_at;
    Ok(order)
}

fn record_miss(operation: &'static str, id: OrderId) {
    tracing::debug!(order_id = %id, operation, "Conditional update matched no order");
    metrics::counter!("orders_store.conditional_miss", "operation" => operation).increment(1);
}

impl OrderStore for PostgresOrderStore {
    fn insert(&self, order: Order) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let document = serde_json::to_value(&order)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            sqlx::query(
                r"
                INSERT INTO orders (id, customer_id, status, deleted, created_at, updated_at, document)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(order.id.as_uuid())
            .bind(order.customer_id.as_uuid())
            .bind(order.status.as_str())
            .bind(order.deleted)
            .bind(order.created_at)
            .bind(order.updated_at)
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

            Ok(())
        })
    }

    fn find_by_id(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StoreError>> {
        Box::pin(async move {
            let row: Option<OrderRow> = sqlx::query_as(FIND_BY_ID)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;

            row.map(decode).transpose()
        })
    }

    fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE orders
                SET status = $3,
                    updated_at = $4,
                    document = document || jsonb_build_object('status', $3::text, 'updated_at', $4::timestamptz)
                WHERE id = $1 AND status = $2 AND NOT deleted
                ",
            )
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

            let outcome = UpdateOutcome::from_rows(result.rows_affected());
            if outcome == UpdateOutcome::NotMatched {
                record_miss("transition", id);
            }
            Ok(outcome)
        })
    }

    fn mark_deleted(
        &self,
        id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE orders
                SET deleted = TRUE,
                    updated_at = $3,
                    document = document || jsonb_build_object('deleted', TRUE, 'updated_at', $3::timestamptz)
                WHERE id = $1 AND status = $2 AND NOT deleted
                ",
            )
            .bind(id.as_uuid())
            .bind(expected.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

            let outcome = UpdateOutcome::from_rows(result.rows_affected());
            if outcome == UpdateOutcome::NotMatched {
                record_miss("delete", id);
            }
            Ok(outcome)
        })
    }

    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Order>, StoreError>> {
        Box::pin(async move {
            let (limit, offset) = limit_offset(page);
            let rows: Vec<OrderRow> = sqlx::query_as(LIST_VISIBLE)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;

            rows.into_iter().map(decode).collect()
        })
    }
}
