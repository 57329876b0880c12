//! `PostgreSQL` stores for the storefront services.
//!
//! Each record is kept as a JSONB document next to the few columns that
//! queries filter or sort on. Mutable fields that conditional writes touch
//! (`status`, `deleted`, `updated_at`) live in columns and take precedence
//! over the document when a row is read back.
//!
//! - [`PostgresOrderStore`]: orders with match-and-set status updates
//! - [`PostgresCustomerStore`]: customers with a unique e-mail column
//! - [`PostgresSessionStore`]: login sessions
//!
//! # Example
//!
//! ```ignore
//! use storefront_postgres::{connect, PostgresOrderStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/storefront", 10, 5).await?;
//!     storefront_postgres::run_migrations(&pool).await?;
//!     let orders = PostgresOrderStore::from_pool(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod customers;
mod orders;

pub use customers::{PostgresCustomerStore, PostgresSessionStore};
pub use orders::PostgresOrderStore;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use storefront_core::StoreError;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Opens a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database cannot be reached.
pub async fn connect(
    url: &str,
    max_connections: u32,
    acquire_timeout_secs: u64,
) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
        .connect(url)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
}

/// Applies pending migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub(crate) fn database_error(err: &sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(db.message().to_string());
        }
    }
    StoreError::Database(err.to_string())
}

pub(crate) fn limit_offset(page: storefront_core::Pagination) -> (i64, i64) {
    (
        i64::from(page.limit()),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}
