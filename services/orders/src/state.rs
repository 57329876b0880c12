//! Shared state for the order handlers.

use crate::lifecycle::OrderLifecycle;
use crate::pricing::PricingResolver;
use std::sync::Arc;
use storefront_core::environment::Clock;
use storefront_core::lookup::CustomerLookup;
use storefront_core::store::OrderStore;

/// Application state handed to every order handler.
#[derive(Clone)]
pub struct AppState {
    /// Order lifecycle engine
    pub lifecycle: Arc<OrderLifecycle>,
    /// Pricing/discount resolver
    pub pricing: Arc<PricingResolver>,
}

impl AppState {
    /// Wire the engine and the resolver over one store and one clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lifecycle: Arc::new(OrderLifecycle::new(store.clone(), customers, clock.clone())),
            pricing: Arc::new(PricingResolver::new(store, clock)),
        }
    }
}
