//! In-memory store implementations.
//!
//! `HashMap`s behind a `tokio::sync::RwLock`. Conditional writes check and
//! write under one write guard, which gives the same match-and-set atomicity
//! as a single `UPDATE … WHERE` statement.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::cmp::Reverse;
use std::collections::HashMap;
use storefront_core::customer::{Customer, Session};
use storefront_core::store::{CustomerStore, OrderStore, SessionStore, UpdateOutcome};
use storefront_core::{CustomerId, Order, OrderId, OrderStatus, Pagination, StoreError};
use tokio::sync::RwLock;

fn page_of<T: Clone>(sorted: Vec<&T>, page: Pagination) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    sorted.into_iter().skip(skip).take(take).cloned().collect()
}

/// In-memory order store for fast, deterministic testing.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored orders, deleted ones included
    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Whether the store holds no orders
    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut orders = self.orders.write().await;
            if orders.contains_key(&order.id) {
                return Err(StoreError::Duplicate(order.id.to_string()));
            }
            orders.insert(order.id, order);
            Ok(())
        })
    }

    fn find_by_id(&self, id: OrderId) -> BoxFuture<'_, Result<Option<Order>, StoreError>> {
        Box::pin(async move { Ok(self.orders.read().await.get(&id).cloned()) })
    }

    fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let mut orders = self.orders.write().await;
            match orders.get_mut(&id) {
                Some(order) if !order.deleted && order.status == expected => {
                    order.status = next;
                    order.updated_at = at;
                    Ok(UpdateOutcome::Applied)
                }
                _ => Ok(UpdateOutcome::NotMatched),
            }
        })
    }

    fn mark_deleted(
        &self,
        id: OrderId,
        expected: OrderStatus,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let mut orders = self.orders.write().await;
            match orders.get_mut(&id) {
                Some(order) if !order.deleted && order.status == expected => {
                    order.deleted = true;
                    order.updated_at = at;
                    Ok(UpdateOutcome::Applied)
                }
                _ => Ok(UpdateOutcome::NotMatched),
            }
        })
    }

    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Order>, StoreError>> {
        Box::pin(async move {
            let orders = self.orders.read().await;
            let mut visible: Vec<&Order> = orders.values().filter(|o| !o.deleted).collect();
            visible.sort_by_key(|o| (Reverse(o.created_at), o.id.as_uuid()));
            Ok(page_of(visible, page))
        })
    }
}

/// In-memory customer store with unique e-mails.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn insert(&self, customer: Customer) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let mut customers = self.customers.write().await;
            if customers.values().any(|c| c.email == customer.email) {
                return Err(StoreError::Duplicate(customer.email));
            }
            customers.insert(customer.id, customer);
            Ok(())
        })
    }

    fn find_by_id(&self, id: CustomerId) -> BoxFuture<'_, Result<Option<Customer>, StoreError>> {
        Box::pin(async move { Ok(self.customers.read().await.get(&id).cloned()) })
    }

    fn find_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Customer>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .customers
                .read()
                .await
                .values()
                .find(|c| c.email == email)
                .cloned())
        })
    }

    fn update(&self, customer: Customer) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let mut customers = self.customers.write().await;
            if customers
                .values()
                .any(|c| c.id != customer.id && c.email == customer.email)
            {
                return Err(StoreError::Duplicate(customer.email));
            }
            match customers.get_mut(&customer.id) {
                Some(stored) => {
                    *stored = customer;
                    Ok(UpdateOutcome::Applied)
                }
                None => Ok(UpdateOutcome::NotMatched),
            }
        })
    }

    fn delete(&self, id: CustomerId) -> BoxFuture<'_, Result<UpdateOutcome, StoreError>> {
        Box::pin(async move {
            let removed = self.customers.write().await.remove(&id);
            Ok(if removed.is_some() {
                UpdateOutcome::Applied
            } else {
                UpdateOutcome::NotMatched
            })
        })
    }

    fn list(&self, page: Pagination) -> BoxFuture<'_, Result<Vec<Customer>, StoreError>> {
        Box::pin(async move {
            let customers = self.customers.read().await;
            let mut all: Vec<&Customer> = customers.values().collect();
            all.sort_by_key(|c| (Reverse(c.created_at), c.id.as_uuid()));
            Ok(page_of(all, page))
        })
    }
}

/// In-memory session store keyed by token.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&self, session: Session) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.sessions
                .write()
                .await
                .insert(session.token.clone(), session);
            Ok(())
        })
    }

    fn find<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Option<Session>, StoreError>> {
        Box::pin(async move { Ok(self.sessions.read().await.get(token).cloned()) })
    }

    fn revoke_all(&self, customer_id: CustomerId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.sessions
                .write()
                .await
                .retain(|_, s| s.customer_id != customer_id);
            Ok(())
        })
    }
}
