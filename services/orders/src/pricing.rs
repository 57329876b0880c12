//! Pricing/discount resolver.

use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storefront_core::environment::Clock;
use storefront_core::pricing::{PriceBreakdown, quote};
use storefront_core::store::OrderStore;
use storefront_core::{OrderId, ServiceError, Tier};

/// Final price of one order for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPrice {
    /// Priced order
    pub order_id: OrderId,
    /// Tier the price was computed for
    pub tier: Tier,
    /// Original, discount and final amounts
    #[serde(flatten)]
    pub breakdown: PriceBreakdown,
}

/// Computes tier-specific prices from the discounts stored on each order.
#[derive(Clone)]
pub struct PricingResolver {
    store: Arc<dyn OrderStore>,
    clock: Arc<dyn Clock>,
}

impl PricingResolver {
    /// Create a resolver reading orders from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Price `id` for `tier` at the current instant.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`]: no such order
    /// - [`ServiceError::Internal`]: the store failed
    #[tracing::instrument(skip(self), fields(tier = %tier))]
    pub async fn compute_final_price(&self, id: OrderId, tier: &Tier) -> Result<FinalPrice, ServiceError> {
        let order = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(id))?;

        let breakdown = quote(order.total_price, &order.discounts, tier, self.clock.now());
        metrics::record_price_quote(tier.as_str(), breakdown.discount_type.as_deref());
        tracing::debug!(
            original = %breakdown.original_price,
            discount = %breakdown.discount_applied,
            final_price = %breakdown.final_price,
            "Price computed"
        );

        Ok(FinalPrice {
            order_id: id,
            tier: tier.clone(),
            breakdown,
        })
    }
}
