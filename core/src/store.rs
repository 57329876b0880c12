//! Storage seams for orders, customers and sessions.
//!
//! Every trait is dyn-compatible so services hold `Arc<dyn …>` handles and can
//! swap the `PostgreSQL` implementations for in-memory ones in tests.
//!
//! # Implementations
//!
//! - `PostgresOrderStore`, `PostgresCustomerStore`, `PostgresSessionStore`
//!   (in `storefront-postgres`): production
//! - `InMemoryOrderStore`, `InMemoryCustomerStore`, `InMemorySessionStore`
//!   (in `storefront-testing`): fast, deterministic testing
//!
//! # Conditional updates
//!
//! Status writes are match-and-set: the store applies the write only if the
//! stored order still has the expected status (and, for soft-delete, is not
//! deleted yet). A write that matches nothing reports
//! [`UpdateOutcome::NotMatched`] instead of failing, leaving the caller to
//! decide between "not found" and "lost the race".

use crate::customer::{Customer, Session};
use crate::error::StoreError;
use crate::pagination::Pagination;
use crate::status::OrderStatus;
use crate::types::{CustomerId, Order, OrderId};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

/// Result of a conditional write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Exactly one record matched and was written
    Applied,
    /// No record matched the filter
    NotMatched,
}

impl UpdateOutcome {
    /// Builds an outcome from an affected-row count.
    #[must_use]
    pub const fn from_rows(rows: u64) -> Self {
        if rows == 0 { Self::NotMatched } else { Self::Applied }
    }
}

/// Persistence for orders.
pub trait OrderStore: Send + Sync {
    /// Inserts a new order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database or serialization failure.
    fn insert(&self, order: Order) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Loads an order by id, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database or serialization failure.
    fn find_by_id(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StoreError>>;

    /// Sets `status = next` and `updated_at = at` if the order exists, is not
    /// deleted and currently has status `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>>;

    /// Sets `deleted = true` and `updated_at = at` if the order exists, is not
    /// deleted yet and currently has status `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn mark_deleted(
        &self,
        id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>>;

    /// Returns one page of non-deleted orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database or serialization failure.
    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Order>, StoreError>>;
}

/// Persistence for customers.
pub trait CustomerStore: Send + Sync {
    /// Inserts a new customer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the e-mail is taken.
    fn insert(&self, customer: Customer) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Loads a customer by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn find_by_id(&self, id: CustomerId) -> BoxFuture<'_, Result<Option<Customer>, StoreError>>;

    /// Loads a customer by (lowercase) e-mail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Customer>, StoreError>>;

    /// Replaces a stored customer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the new e-mail is taken.
    fn update(&self, customer: Customer) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>>;

    /// Physically removes a customer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn delete(&self, id: CustomerId) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>>;

    /// Returns one page of customers, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Customer>, StoreError>>;
}

/// Persistence for login sessions.
pub trait SessionStore: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn insert(&self, session: Session) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Loads a session by token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn find<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Option<Session>, StoreError>>;

    /// Removes every session of a customer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on database failure.
    fn revoke_all(&self, customer_id: CustomerId) -> BoxFuture<'_, Result<(), StoreError>>;
}
