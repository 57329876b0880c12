//! Tier-based discount selection and final price computation.
//!
//! Both steps are pure: callers supply the order's discounts, the caller's
//! tier and the current instant.

use crate::types::{Discount, DiscountType, Money, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of pricing an order for one tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Order total before discounts
    pub original_price: Money,
    /// Amount subtracted, within `[0, original_price]`
    pub discount_applied: Money,
    /// `original_price - discount_applied`, never negative
    pub final_price: Money,
    /// Type of the discount used, absent if none matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<String>,
}

/// Picks the first discount for `tier` whose window contains `now`.
#[must_use]
pub fn select_discount<'a>(
    discounts: &'a [Discount],
    tier: &Tier,
    now: DateTime<Utc>,
) -> Option<&'a Discount> {
    discounts
        .iter()
        .find(|discount| &discount.tier == tier && discount.is_active_at(now))
}

/// Applies an optional discount to `total`.
///
/// `percentage` subtracts `total × value / 100`, `fixed-amount` subtracts
/// `value` cents, anything else subtracts nothing but is still reported as
/// `unknown`. The subtracted amount is clamped to `[0, total]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn apply_discount(total: Money, discount: Option<&Discount>) -> PriceBreakdown {
    let Some(discount) = discount else {
        return PriceBreakdown {
            original_price: total,
            discount_applied: Money::ZERO,
            final_price: total,
            discount_type: None,
        };
    };

    let raw = match discount.kind {
        DiscountType::Percentage => total.cents() as f64 * discount.value / 100.0,
        DiscountType::FixedAmount => discount.value,
        DiscountType::Unknown(_) => 0.0,
    };
    let applied = clamp_cents(raw, total);

    PriceBreakdown {
        original_price: total,
        discount_applied: applied,
        final_price: Money::from_cents(total.cents() - applied.cents()),
        discount_type: Some(discount.kind.label().to_string()),
    }
}

/// Selects and applies in one step.
#[must_use]
pub fn quote(total: Money, discounts: &[Discount], tier: &Tier, now: DateTime<Utc>) -> PriceBreakdown {
    apply_discount(total, select_discount(discounts, tier, now))
}

#[allow(clippy::cast_possible_truncation)] // bounded by `total` before the cast
#[allow(clippy::cast_precision_loss)]
fn clamp_cents(raw: f64, total: Money) -> Money {
    let ceiling = total.cents().max(0);
    if !raw.is_finite() || raw <= 0.0 {
        return Money::ZERO;
    }
    let rounded = raw.round();
    if rounded >= ceiling as f64 {
        return Money::from_cents(ceiling);
    }
    Money::from_cents(rounded as i64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn discount(tier: Tier, kind: DiscountType, value: f64) -> Discount {
        Discount {
            id: "d-1".to_string(),
            tier,
            starts_at: now() - Duration::days(1),
            ends_at: now() + Duration::days(1),
            code: None,
            kind,
            value,
        }
    }

    #[test]
    fn test_percentage() {
        let d = discount(Tier::premium(), DiscountType::Percentage, 10.0);
        let price = apply_discount(Money::from_cents(10_000), Some(&d));

        assert_eq!(price.discount_applied, Money::from_cents(1_000));
        assert_eq!(price.final_price, Money::from_cents(9_000));
        assert_eq!(price.discount_type.as_deref(), Some("percentage"));
    }

    #[test]
    fn test_fixed_amount_is_clamped_at_zero() {
        let d = discount(Tier::premium(), DiscountType::FixedAmount, 50_000.0);
        let price = apply_discount(Money::from_cents(10_000), Some(&d));

        assert_eq!(price.discount_applied, Money::from_cents(10_000));
        assert_eq!(price.final_price, Money::ZERO);
    }

    #[test]
    fn test_unknown_type_reports_unknown_and_subtracts_nothing() {
        let d = discount(Tier::premium(), DiscountType::Unknown("bogo".to_string()), 99.0);
        let price = apply_discount(Money::from_cents(500), Some(&d));

        assert_eq!(price.discount_applied, Money::ZERO);
        assert_eq!(price.final_price, Money::from_cents(500));
        assert_eq!(price.discount_type.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_other_tier_is_not_applied() {
        let discounts = vec![discount(Tier::non_premium(), DiscountType::Percentage, 20.0)];
        let price = quote(Money::from_cents(1_000), &discounts, &Tier::premium(), now());

        assert_eq!(price.final_price, price.original_price);
        assert_eq!(price.discount_type, None);
    }

    #[test]
    fn test_window_is_half_open() {
        let mut d = discount(Tier::premium(), DiscountType::Percentage, 20.0);
        d.starts_at = now();
        d.ends_at = now() + Duration::hours(1);
        let discounts = [d];

        assert!(select_discount(&discounts, &Tier::premium(), now()).is_some());
        assert!(select_discount(&discounts, &Tier::premium(), now() + Duration::hours(1)).is_none());
        assert!(select_discount(&discounts, &Tier::premium(), now() - Duration::seconds(1)).is_none());
    }

    #[test]
    fn test_first_matching_discount_wins() {
        let mut first = discount(Tier::premium(), DiscountType::FixedAmount, 100.0);
        first.id = "first".to_string();
        let mut second = discount(Tier::premium(), DiscountType::Percentage, 50.0);
        second.id = "second".to_string();
        let discounts = [first, second];

        let picked = select_discount(&discounts, &Tier::premium(), now()).unwrap();
        assert_eq!(picked.id, "first");
    }

    fn kind_strategy() -> impl Strategy<Value = DiscountType> {
        prop_oneof![
            Just(DiscountType::Percentage),
            Just(DiscountType::FixedAmount),
            Just(DiscountType::Unknown("other".to_string())),
        ]
    }

    proptest! {
        #[test]
        fn prop_discount_never_increases_price(
            total in 0i64..10_000_000,
            kind in kind_strategy(),
            value in prop::num::f64::ANY,
        ) {
            let total = Money::from_cents(total);
            let d = discount(Tier::premium(), kind, value);

            let without = apply_discount(total, None);
            let with = apply_discount(total, Some(&d));

            prop_assert!(with.final_price <= without.final_price);
            prop_assert!(with.final_price >= Money::ZERO);
            prop_assert_eq!(
                with.final_price.cents() + with.discount_applied.cents(),
                total.cents()
            );
        }
    }
}
