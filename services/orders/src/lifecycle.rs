//! Order lifecycle engine.
//!
//! Orchestrates creation with customer verification, the status transitions
//! and soft-deletion. Status changes are a read, a check against the
//! transition table and one conditional write whose filter carries the status
//! that was read:
//!
//! ```text
//!  find_by_id ──▶ Transition::check ──▶ transition_status(id, expected, next)
//!                                              │
//!                          Applied ◀───────────┤
//!                                              └──▶ NotMatched ──▶ re-read
//!                                                     absent  → NotFound
//!                                                     present → StateConflict
//! ```
//!
//! No lock is taken: of two concurrent transitions on one order exactly one
//! write matches, the other surfaces as a conflict.

use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::environment::Clock;
use storefront_core::lookup::CustomerLookup;
use storefront_core::store::{OrderStore, UpdateOutcome};
use storefront_core::{
    CustomerSnapshot, LookupError, NewOrder, Order, OrderId, OrderStatus, Pagination,
    ServiceError, Transition,
};
use tracing::{error, info, warn};

/// An order joined with the current snapshot of its customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    /// The stored order
    #[serde(flatten)]
    pub order: Order,
    /// The customer, fetched at read time
    pub customer: CustomerSnapshot,
}

/// Order lifecycle engine.
#[derive(Clone)]
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerLookup>,
    clock: Arc<dyn Clock>,
}

impl OrderLifecycle {
    /// Create an engine over a store, a customer lookup and a clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            customers,
            clock,
        }
    }

    /// Place an order for a confirmed customer.
    ///
    /// The draft is validated before the customer service is called, and
    /// nothing is persisted unless the customer is confirmed.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidInput`]: the draft is invalid
    /// - [`ServiceError::NotFound`]: the customer cannot be confirmed
    /// - [`ServiceError::DependencyFailure`]: the customer service is unreachable
    /// - [`ServiceError::Internal`]: the store failed
    #[tracing::instrument(skip(self, draft, credential), fields(customer_id = %draft.customer_id))]
    pub async fn create(&self, draft: NewOrder, credential: &str) -> Result<OrderId, ServiceError> {
        draft.validate()?;
        self.confirm_customer(&draft, credential).await?;

        let order = Order::place(OrderId::generate(), draft, self.clock.now())?;
        let id = order.id;
        let total = order.total_price;

        self.store.insert(order).await?;

        metrics::record_order_created();
        info!(order_id = %id, total = %total, "Order created");
        Ok(id)
    }

    async fn confirm_customer(&self, draft: &NewOrder, credential: &str) -> Result<(), ServiceError> {
        match self.customers.fetch_customer(draft.customer_id, credential).await {
            Ok(customer) if customer.is_active => Ok(()),
            Ok(_) => {
                warn!(customer_id = %draft.customer_id, "Customer is inactive");
                Err(ServiceError::customer_not_found(draft.customer_id))
            }
            Err(err) => Err(lookup_failure(err)),
        }
    }

    /// Fetch an order and join the current customer snapshot.
    ///
    /// Soft-deleted orders are still returned, with `deleted = true`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`]: the order or its customer is absent
    /// - [`ServiceError::DependencyFailure`]: the customer service is unreachable
    /// - [`ServiceError::Internal`]: the store failed
    #[tracing::instrument(skip(self, credential))]
    pub async fn get_by_id(&self, id: OrderId, credential: &str) -> Result<OrderView, ServiceError> {
        let order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(id))?;

        let customer = self
            .customers
            .fetch_customer(order.customer_id, credential)
            .await
            .map_err(lookup_failure)?;

        Ok(OrderView { order, customer })
    }

    /// `ORDERED → SHIPPED`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`]: no such order
    /// - [`ServiceError::StateConflict`]: the order is not `ORDERED`, or another
    ///   transition won the race
    /// - [`ServiceError::Internal`]: the store failed
    pub async fn ship(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.apply(id, Transition::Ship).await
    }

    /// `SHIPPED → DELIVERED`.
    ///
    /// # Errors
    ///
    /// See [`OrderLifecycle::ship`].
    pub async fn deliver(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.apply(id, Transition::Deliver).await
    }

    /// `ORDERED → CANCELED`.
    ///
    /// # Errors
    ///
    /// See [`OrderLifecycle::ship`].
    pub async fn cancel(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.apply(id, Transition::Cancel).await
    }

    /// Flag a `DELIVERED` or `CANCELED` order as deleted. The record is kept.
    ///
    /// # Errors
    ///
    /// See [`OrderLifecycle::ship`]; deleting twice is a conflict.
    pub async fn delete_softly(&self, id: OrderId) -> Result<Order, ServiceError> {
        self.apply(id, Transition::SoftDelete).await
    }

    #[tracing::instrument(skip(self), fields(operation = transition.name()))]
    async fn apply(&self, id: OrderId, transition: Transition) -> Result<Order, ServiceError> {
        let result = self.try_apply(id, transition).await;

        let outcome = match &result {
            Ok(order) => {
                info!(status = %order.status, deleted = order.deleted, "Order updated");
                "applied"
            }
            Err(err @ ServiceError::StateConflict { .. }) => {
                warn!(error = %err, "Transition rejected");
                "conflict"
            }
            Err(ServiceError::NotFound { .. }) => "not_found",
            Err(err) => {
                error!(error = %err, "Transition failed");
                "error"
            }
        };
        metrics::record_transition(transition.name(), outcome);

        result
    }

    async fn try_apply(&self, id: OrderId, transition: Transition) -> Result<Order, ServiceError> {
        let mut order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(id))?;

        if order.deleted {
            return Err(transition.conflict(order.status));
        }

        let expected = order.status;
        let next = transition.check(expected)?;
        let now = self.clock.now();

        let outcome = match transition {
            Transition::SoftDelete => self.store.mark_deleted(id, expected, now).await?,
            _ => self.store.transition_status(id, expected, next, now).await?,
        };

        match outcome {
            UpdateOutcome::Applied => {
                order.status = next;
                order.updated_at = now;
                order.deleted |= transition == Transition::SoftDelete;
                Ok(order)
            }
            UpdateOutcome::NotMatched => Err(self.lost_race(id, transition, expected).await),
        }
    }

    /// Classifies a conditional write that matched nothing.
    async fn lost_race(&self, id: OrderId, transition: Transition, expected: OrderStatus) -> ServiceError {
        match self.store.find_by_id(id).await {
            Ok(Some(current)) => {
                warn!(
                    order_id = %id,
                    expected = %expected,
                    current = %current.status,
                    "Concurrent transition won the race"
                );
                transition.conflict(current.status)
            }
            Ok(None) => ServiceError::order_not_found(id),
            Err(err) => err.into(),
        }
    }

    /// A page of non-deleted orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self, page: Pagination) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list(page).await?)
    }
}

fn lookup_failure(err: LookupError) -> ServiceError {
    if let LookupError::Transport(reason) = &err {
        error!(error = %reason, "Customer service unavailable");
    }
    err.into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use storefront_core::{CustomerId, Money};
    use storefront_testing::{InMemoryOrderStore, MockCustomerLookup, fixtures, test_clock};

    struct Harness {
        engine: OrderLifecycle,
        store: Arc<InMemoryOrderStore>,
        lookup: Arc<MockCustomerLookup>,
        customer: CustomerSnapshot,
    }

    fn harness() -> Harness {
        let customer = fixtures::customer_snapshot("premium");
        let store = Arc::new(InMemoryOrderStore::new());
        let lookup = Arc::new(MockCustomerLookup::new().with_customer(customer.clone()));
        let engine = OrderLifecycle::new(store.clone(), lookup.clone(), Arc::new(test_clock()));
        Harness {
            engine,
            store,
            lookup,
            customer,
        }
    }

    async fn placed(h: &Harness) -> OrderId {
        let draft = fixtures::new_order(h.customer.id, vec![fixtures::line_item(2, 5_000)]);
        h.engine.create(draft, "Bearer t").await.unwrap()
    }

    #[tokio::test]
    async fn test_scenario_a_full_lifecycle() {
        let h = harness();
        let id = placed(&h).await;

        let view = h.engine.get_by_id(id, "").await.unwrap();
        assert_eq!(view.order.total_price, Money::from_cents(10_000));
        assert_eq!(view.order.status, OrderStatus::Ordered);

        assert_eq!(h.engine.ship(id).await.unwrap().status, OrderStatus::Shipped);
        assert_eq!(h.engine.deliver(id).await.unwrap().status, OrderStatus::Delivered);

        let err = h.engine.cancel(id).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::StateConflict {
                operation: "cancel",
                current: OrderStatus::Delivered,
                required: vec![OrderStatus::Ordered],
            }
        );
        assert_eq!(err.to_string(), "Cannot cancel order while it is in 'DELIVERED' status.");
    }

    #[tokio::test]
    async fn test_scenario_b_unknown_customer_persists_nothing() {
        let h = harness();
        let draft = fixtures::new_order(CustomerId::generate(), vec![fixtures::line_item(1, 100)]);

        let err = h.engine.create(draft, "").await.unwrap_err();

        assert!(matches!(err, ServiceError::NotFound { resource: "Customer", .. }));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_lookup_transport_failure_is_dependency_failure() {
        let store = Arc::new(InMemoryOrderStore::new());
        let engine = OrderLifecycle::new(
            store.clone(),
            Arc::new(MockCustomerLookup::unreachable()),
            Arc::new(test_clock()),
        );
        let draft = fixtures::new_order(CustomerId::generate(), vec![fixtures::line_item(1, 100)]);

        let err = engine.create(draft, "").await.unwrap_err();

        assert!(matches!(err, ServiceError::DependencyFailure(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_customer_service() {
        let h = harness();
        let draft = fixtures::new_order(h.customer.id, Vec::new());

        let err = h.engine.create(draft, "").await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(h.lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_inactive_customer_cannot_order() {
        let h = harness();
        let mut inactive = fixtures::customer_snapshot("premium");
        inactive.is_active = false;
        h.lookup.upsert(inactive.clone()).await;

        let draft = fixtures::new_order(inactive.id, vec![fixtures::line_item(1, 100)]);
        assert!(matches!(
            h.engine.create(draft, "").await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_credential_is_forwarded() {
        let h = harness();
        placed(&h).await;
        assert_eq!(h.lookup.last_credential().await.as_deref(), Some("Bearer t"));
    }

    #[tokio::test]
    async fn test_get_joins_live_customer_snapshot() {
        let h = harness();
        let id = placed(&h).await;

        let mut renamed = h.customer.clone();
        renamed.first_name = "Augusta".to_string();
        h.lookup.upsert(renamed).await;

        let view = h.engine.get_by_id(id, "").await.unwrap();
        assert_eq!(view.customer.first_name, "Augusta");
    }

    #[tokio::test]
    async fn test_get_fails_when_customer_vanished() {
        let h = harness();
        let id = placed(&h).await;
        h.lookup.remove(h.customer.id).await;

        assert!(matches!(
            h.engine.get_by_id(id, "").await,
            Err(ServiceError::NotFound { resource: "Customer", .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let h = harness();
        let id = OrderId::generate();

        assert_eq!(h.engine.ship(id).await, Err(ServiceError::order_not_found(id)));
        assert!(matches!(h.engine.get_by_id(id, "").await, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_repeated_ship_is_a_conflict() {
        let h = harness();
        let id = placed(&h).await;

        h.engine.ship(id).await.unwrap();
        assert!(matches!(
            h.engine.ship(id).await,
            Err(ServiceError::StateConflict { current: OrderStatus::Shipped, .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_ships_apply_once() {
        let h = harness();
        let id = placed(&h).await;

        let attempts = (0..8).map(|_| {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.ship(id).await })
        });
        let results = futures::future::join_all(attempts).await;

        let applied = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(ServiceError::StateConflict { .. }))))
            .count();
        assert_eq!(applied, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn test_soft_delete_requires_terminal_status() {
        let h = harness();
        let id = placed(&h).await;

        assert!(matches!(
            h.engine.delete_softly(id).await,
            Err(ServiceError::StateConflict { operation: "delete", current: OrderStatus::Ordered, .. })
        ));

        h.engine.cancel(id).await.unwrap();
        let deleted = h.engine.delete_softly(id).await.unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.status, OrderStatus::Canceled);

        assert!(matches!(
            h.engine.delete_softly(id).await,
            Err(ServiceError::StateConflict { .. })
        ));

        let view = h.engine.get_by_id(id, "").await.unwrap();
        assert!(view.order.deleted);
        assert!(h.engine.list_all(Pagination::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_pages_visible_orders() {
        let h = harness();
        for _ in 0..3 {
            placed(&h).await;
        }

        let first = h.engine.list_all(Pagination::new(1, 2)).await.unwrap();
        let second = h.engine.list_all(Pagination::new(2, 2)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
    }
}
