//! Customer documents and login sessions.

use crate::{database_error, limit_offset};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::PgPool;
use sqlx::types::JsonValue;
use storefront_core::customer::{Customer, Session};
use storefront_core::store::{CustomerStore, SessionStore, UpdateOutcome};
use storefront_core::{CustomerId, Pagination, StoreError};
use uuid::Uuid;

fn decode(document: JsonValue) -> Result<Customer, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn encode(customer: &Customer) -> Result<JsonValue, StoreError> {
    serde_json::to_value(customer).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// `PostgreSQL`-backed [`CustomerStore`].
#[derive(Clone, Debug)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CustomerStore for PostgresCustomerStore {
    fn insert(&self, customer: Customer) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("INSERT INTO customers (id, email, created_at, document) VALUES ($1, $2, $3, $4)")
                .bind(customer.id.as_uuid())
                .bind(&customer.email)
                .bind(customer.created_at)
                .bind(encode(&customer)?)
                .execute(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
            Ok(())
        })
    }

    fn find_by_id(&self, id: CustomerId) -> BoxFuture<'_, Result<Option<Customer>, StoreError>> {
        Box::pin(async move {
            let row: Option<(JsonValue,)> =
                sqlx::query_as("SELECT document FROM customers WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| database_error(&e))?;
            row.map(|(document,)| decode(document)).transpose()
        })
    }

    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Customer>, StoreError>> {
        Box::pin(async move {
            let row: Option<(JsonValue,)> =
                sqlx::query_as("SELECT document FROM customers WHERE email = $1")
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| database_error(&e))?;
            row.map(|(document,)| decode(document)).transpose()
        })
    }

    fn update(&self, customer: Customer) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE customers SET email = $2, document = $3 WHERE id = $1")
                .bind(customer.id.as_uuid())
                .bind(&customer.email)
                .bind(encode(&customer)?)
                .execute(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
            Ok(UpdateOutcome::from_rows(result.rows_affected()))
        })
    }

    fn delete(&self, id: CustomerId) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM customers WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
            Ok(UpdateOutcome::from_rows(result.rows_affected()))
        })
    }

    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Customer>, StoreError>> {
        Box::pin(async move {
            let (limit, offset) = limit_offset(page);
            let rows: Vec<(JsonValue,)> = sqlx::query_as(
                "SELECT document FROM customers ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
            rows.into_iter().map(|(document,)| decode(document)).collect()
        })
    }
}

/// `PostgreSQL`-backed [`SessionStore`].
#[derive(Clone, Debug)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SessionStore for PostgresSessionStore {
    fn insert(&self, session: Session) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO sessions (token, customer_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(&session.token)
            .bind(session.customer_id.as_uuid())
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;
            Ok(())
        })
    }

    fn find<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Option<Session>, StoreError>> {
        Box::pin(async move {
            let row: Option<(String, Uuid, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
                "SELECT token, customer_id, created_at, expires_at FROM sessions WHERE token = $1",
            )
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error(&e))?;

            Ok(row.map(|(token, customer_id, created_at, expires_at)| Session {
                token,
                customer_id: CustomerId::new(customer_id),
                created_at,
                expires_at,
            }))
        })
    }

    fn revoke_all(&self, customer_id: CustomerId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM sessions WHERE customer_id = $1")
                .bind(customer_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| database_error(&e))?;
            Ok(())
        })
    }
}
