//! # Storefront Testing
//!
//! Testing utilities for the storefront services.
//!
//! This crate provides:
//! - In-memory implementations of the store seams ([`memory`])
//! - Mock implementations of environment traits ([`mocks`])
//! - Builders for common domain values ([`fixtures`])
//!
//! The in-memory stores honour the same conditional-write semantics as the
//! `PostgreSQL` ones, so the service binaries also use them when no database
//! is configured.
//!
//! ## Example
//!
//! ```
//! use storefront_testing::{fixtures, test_clock, InMemoryOrderStore, MockCustomerLookup};
//!
//! let snapshot = fixtures::customer_snapshot("premium");
//! let lookup = MockCustomerLookup::new().with_customer(snapshot);
//! let store = InMemoryOrderStore::new();
//! let clock = test_clock();
//! # let _ = (lookup, store, clock);
//! ```

pub mod memory;

/// Mock implementations for testing.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use storefront_core::environment::Clock;
    use storefront_core::lookup::CustomerLookup;
    use storefront_core::{CustomerId, CustomerSnapshot, LookupError};
    use tokio::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }

    /// Scripted customer lookup.
    ///
    /// Answers from a fixed set of snapshots, counts calls and records the last
    /// forwarded credential. [`MockCustomerLookup::unreachable`] builds one that
    /// fails every call with a transport error.
    #[derive(Debug, Default)]
    pub struct MockCustomerLookup {
        customers: RwLock<HashMap<CustomerId, CustomerSnapshot>>,
        unreachable: AtomicBool,
        delay: Option<Duration>,
        calls: AtomicUsize,
        last_credential: RwLock<Option<String>>,
    }

    impl MockCustomerLookup {
        /// Lookup that knows no customers
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Lookup whose every call fails with [`LookupError::Transport`]
        #[must_use]
        pub fn unreachable() -> Self {
            let lookup = Self::default();
            lookup.unreachable.store(true, Ordering::SeqCst);
            lookup
        }

        /// Adds a known customer
        #[must_use]
        pub fn with_customer(mut self, snapshot: CustomerSnapshot) -> Self {
            self.customers.get_mut().insert(snapshot.id, snapshot);
            self
        }

        /// Delays every answer, to exercise deadlines
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Adds or replaces a known customer at runtime
        pub async fn upsert(&self, snapshot: CustomerSnapshot) {
            self.customers.write().await.insert(snapshot.id, snapshot);
        }

        /// Forgets a customer at runtime
        pub async fn remove(&self, id: CustomerId) {
            self.customers.write().await.remove(&id);
        }

        /// Number of `fetch_customer` calls so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Credential forwarded by the most recent call
        pub async fn last_credential(&self) -> Option<String> {
            self.last_credential.read().await.clone()
        }
    }

    impl CustomerLookup for MockCustomerLookup {
        fn fetch_customer<'a>(
            &'a self,
            id: CustomerId,
            credential: &'a str,
        ) -> BoxFuture<'a, Result<CustomerSnapshot, LookupError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                *self.last_credential.write().await = Some(credential.to_string());

                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.unreachable.load(Ordering::SeqCst) {
                    return Err(LookupError::Transport("connection refused".to_string()));
                }

                self.customers
                    .read()
                    .await
                    .get(&id)
                    .cloned()
                    .ok_or(LookupError::NotFound(id))
            })
        }
    }
}

/// Builders for common domain values.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};
    use storefront_core::{
        Address, CustomerId, CustomerSnapshot, Discount, DiscountType, LineItem, Money, NewOrder,
        Tier,
    };

    /// A complete address
    #[must_use]
    pub fn address() -> Address {
        Address {
            address_id: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        }
    }

    /// A line item
    #[must_use]
    pub fn line_item(quantity: u32, unit_price_cents: i64) -> LineItem {
        LineItem::new(
            "sku-100".to_string(),
            "Desk Lamp".to_string(),
            quantity,
            Money::from_cents(unit_price_cents),
        )
    }

    /// An active customer with the given tier
    #[must_use]
    pub fn customer_snapshot(tier: &str) -> CustomerSnapshot {
        CustomerSnapshot {
            id: CustomerId::generate(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            role: Tier::new(tier),
            is_active: true,
            phones: Vec::new(),
            addresses: vec![address()],
        }
    }

    /// A valid order draft for `customer_id`
    #[must_use]
    pub fn new_order(customer_id: CustomerId, items: Vec<LineItem>) -> NewOrder {
        NewOrder {
            customer_id,
            items,
            shipping_address: address(),
            billing_address: address(),
            discounts: Vec::new(),
        }
    }

    /// A discount valid for one day on each side of `now`
    #[must_use]
    pub fn discount(tier: &str, kind: DiscountType, value: f64, now: DateTime<Utc>) -> Discount {
        Discount {
            id: format!("{tier}-{}", kind.label()),
            tier: Tier::new(tier),
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(1),
            code: None,
            kind,
            value,
        }
    }
}

// Re-export commonly used items
pub use memory::{InMemoryCustomerStore, InMemoryOrderStore, InMemorySessionStore};
pub use mocks::{FixedClock, MockCustomerLookup, test_clock};
