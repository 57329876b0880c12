//! Business metrics for the order service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `orders_created_total` - Orders placed
//! - `order_transitions_total{operation,outcome}` - Status changes and soft-deletes
//!   by outcome (`applied`, `conflict`, `not_found`)
//! - `customer_lookups_total{outcome}` - Calls to the customer service by outcome
//!   (`found`, `not_found`, `transport_error`)
//! - `price_quotes_total{tier,discount}` - Price quotes by tier (`premium`,
//!   `non-premium`, `admin`, anything else as `other`) and discount type
//!
//! ## Histograms
//! - `customer_lookup_duration_seconds` - Customer service round-trip time

use metrics::{describe_counter, describe_histogram};
use storefront_core::Tier;

/// Register metric descriptions. Call once at startup, before recording.
pub fn register_order_metrics() {
    describe_counter!("orders_created_total", "Total number of orders placed");
    describe_counter!(
        "order_transitions_total",
        "Order status transitions by operation and outcome (applied, conflict, not_found)"
    );
    describe_counter!(
        "customer_lookups_total",
        "Customer service lookups by outcome (found, not_found, transport_error)"
    );
    describe_histogram!(
        "customer_lookup_duration_seconds",
        "Round-trip time of customer service lookups"
    );
    describe_counter!(
        "price_quotes_total",
        "Price quotes by tier and applied discount type"
    );

    tracing::info!("Order metrics registered");
}

/// Record an order placed.
pub fn record_order_created() {
    metrics::counter!("orders_created_total").increment(1);
}

/// Record the outcome of a lifecycle operation.
pub fn record_transition(operation: &'static str, outcome: &'static str) {
    metrics::counter!("order_transitions_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Record a customer service call.
pub fn record_customer_lookup(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("customer_lookups_total", "outcome" => outcome).increment(1);
    metrics::histogram!("customer_lookup_duration_seconds").record(duration_secs);
}

/// Record a price quote.
pub fn record_price_quote(tier: &str, discount: Option<&str>) {
    metrics::counter!(
        "price_quotes_total",
        "tier" => tier_label(tier),
        "discount" => discount.unwrap_or("none").to_string()
    )
    .increment(1);
}

/// Tiers come from the customer service, so unknown ones share one label.
fn tier_label(tier: &str) -> &'static str {
    match tier {
        Tier::PREMIUM => Tier::PREMIUM,
        Tier::NON_PREMIUM => Tier::NON_PREMIUM,
        Tier::ADMIN => Tier::ADMIN,
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_label_is_bounded() {
        assert_eq!(tier_label("premium"), "premium");
        assert_eq!(tier_label("non-premium"), "non-premium");
        assert_eq!(tier_label("admin"), "admin");
        assert_eq!(tier_label("gold"), "other");
        assert_eq!(tier_label(&"x".repeat(1024)), "other");
    }
}
