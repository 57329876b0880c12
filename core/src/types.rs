//! Core domain types for orders and their pricing terms.
//!
//! Orders progress through the statuses defined in [`crate::status`]. Totals
//! are computed once at creation from the line items and never recomputed.

use crate::error::ServiceError;
use crate::status::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an order
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new `OrderId` from a UUID
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ServiceError::InvalidInput(format!("invalid order id '{s}'")))
    }
}

/// Unique identifier for a customer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new `CustomerId` from a UUID
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "customer id is required".to_string(),
            ));
        }
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ServiceError::InvalidInput(format!("invalid customer id '{s}'")))
    }
}

/// Money amount in cents (to avoid floating point issues)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in whole currency units (as floating point)
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // i64 to f64 precision loss is acceptable for display
    pub fn units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.units())
    }
}

/// A single line item in an order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier
    pub product_id: String,
    /// Product name for display
    pub product_name: String,
    /// Quantity ordered
    pub quantity: u32,
    /// Price per unit in cents
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a new line item
    #[must_use]
    pub const fn new(product_id: String, product_name: String, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            product_name,
            quantity,
            unit_price,
        }
    }

    /// Calculates the total price for this line item, `None` on overflow
    #[must_use]
    pub const fn total(&self) -> Option<Money> {
        match self.unit_price.0.checked_mul(self.quantity as i64) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// Sums `quantity × unit_price` over the given items.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidInput`] if the sum does not fit in an `i64`
/// number of cents.
pub fn total_price(items: &[LineItem]) -> Result<Money, ServiceError> {
    items.iter().try_fold(Money::ZERO, |acc, item| {
        item.total()
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| ServiceError::InvalidInput("order total is too large".to_string()))
    })
}

/// Postal address attached to an order or a customer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Optional caller-supplied identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    /// City name
    pub city: String,
    /// State or region
    pub state: String,
    /// Postal code
    pub zip_code: String,
}

impl Address {
    /// Checks that city, state and zip code are present.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] naming the first missing field.
    pub fn validate(&self, label: &str) -> Result<(), ServiceError> {
        for (field, value) in [
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::InvalidInput(format!(
                    "{label}.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Membership tier (role) of a caller, e.g. `premium`, `non-premium`, `admin`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(String);

impl Tier {
    /// Tier granted to paying members
    pub const PREMIUM: &'static str = "premium";
    /// Tier assigned to new customers
    pub const NON_PREMIUM: &'static str = "non-premium";
    /// Administrative tier
    pub const ADMIN: &'static str = "admin";

    /// Creates a tier from any name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `premium` tier
    #[must_use]
    pub fn premium() -> Self {
        Self::new(Self::PREMIUM)
    }

    /// The `non-premium` tier
    #[must_use]
    pub fn non_premium() -> Self {
        Self::new(Self::NON_PREMIUM)
    }

    /// The `admin` tier
    #[must_use]
    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    /// Returns the tier name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the administrative tier
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a discount reduces the order total
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiscountType {
    /// Subtracts `total × value / 100`
    Percentage,
    /// Subtracts `value` cents
    FixedAmount,
    /// Any tag this system does not understand; contributes nothing
    Unknown(String),
}

impl DiscountType {
    /// Label reported in price quotes
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed-amount",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<String> for DiscountType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "percentage" => Self::Percentage,
            "fixed-amount" => Self::FixedAmount,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<DiscountType> for String {
    fn from(kind: DiscountType) -> Self {
        match kind {
            DiscountType::Unknown(tag) => tag,
            known => known.label().to_string(),
        }
    }
}

/// Discount terms copied onto an order when it is placed.
///
/// The copy is denormalized: later catalog changes never alter a placed order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    /// Discount identifier
    pub id: String,
    /// Tier eligible for this discount
    pub tier: Tier,
    /// Start of the validity window (inclusive)
    pub starts_at: DateTime<Utc>,
    /// End of the validity window (exclusive)
    pub ends_at: DateTime<Utc>,
    /// Optional promotional code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Type tag
    #[serde(rename = "type")]
    pub kind: DiscountType,
    /// Percent for `percentage`, cents for `fixed-amount`
    pub value: f64,
}

impl Discount {
    /// Whether `now` falls inside `[starts_at, ends_at)`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }

    /// Checks the window ordering and the value range.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] for an empty window or a negative
    /// or non-finite value.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.starts_at >= self.ends_at {
            return Err(ServiceError::InvalidInput(format!(
                "discount {} must start before it ends",
                self.id
            )));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(ServiceError::InvalidInput(format!(
                "discount {} has an invalid value",
                self.id
            )));
        }
        Ok(())
    }
}

/// A validated order draft, ready to be placed.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    /// Customer placing the order
    pub customer_id: CustomerId,
    /// Ordered items
    pub items: Vec<LineItem>,
    /// Where to ship
    pub shipping_address: Address,
    /// Where to bill
    pub billing_address: Address,
    /// Discount terms in effect at placement
    pub discounts: Vec<Discount>,
}

impl NewOrder {
    /// Checks items, addresses and discounts.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "order must contain at least one item".to_string(),
            ));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.product_id.trim().is_empty() || item.product_name.trim().is_empty() {
                return Err(ServiceError::InvalidInput(format!(
                    "items[{index}] requires a product id and name"
                )));
            }
            if item.quantity == 0 {
                return Err(ServiceError::InvalidInput(format!(
                    "items[{index}].quantity must be at least 1"
                )));
            }
            if item.unit_price < Money::ZERO {
                return Err(ServiceError::InvalidInput(format!(
                    "items[{index}].unit_price must not be negative"
                )));
            }
        }
        self.shipping_address.validate("shipping_address")?;
        self.billing_address.validate("billing_address")?;
        self.discounts.iter().try_for_each(Discount::validate)
    }
}

/// A persisted order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Customer who placed the order
    pub customer_id: CustomerId,
    /// Ordered items
    pub items: Vec<LineItem>,
    /// Where to ship
    pub shipping_address: Address,
    /// Where to bill
    pub billing_address: Address,
    /// Sum of line totals at creation time
    pub total_price: Money,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Discount terms copied at placement
    pub discounts: Vec<Discount>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change or soft-delete
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag
    pub deleted: bool,
}

impl Order {
    /// Places a new order: validates the draft, computes the total and starts
    /// in [`OrderStatus::Ordered`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidInput`] if the draft is invalid.
    pub fn place(id: OrderId, draft: NewOrder, now: DateTime<Utc>) -> Result<Self, ServiceError> {
        draft.validate()?;
        let total_price = total_price(&draft.items)?;
        Ok(Self {
            id,
            customer_id: draft.customer_id,
            items: draft.items,
            shipping_address: draft.shipping_address,
            billing_address: draft.billing_address,
            total_price,
            status: OrderStatus::Ordered,
            discounts: draft.discounts,
            created_at: now,
            updated_at: now,
            deleted: false,
        })
    }
}

/// Read-only customer view owned by the customer service.
///
/// Fetched fresh whenever needed and never persisted by the order service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    /// Customer identifier
    pub id: CustomerId,
    /// Given name
    #[serde(default)]
    pub first_name: String,
    /// Family name
    #[serde(default)]
    pub last_name: String,
    /// Contact e-mail
    #[serde(default)]
    pub email: String,
    /// Membership tier
    pub role: Tier,
    /// Whether the account is active
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Phone numbers
    #[serde(default)]
    pub phones: Vec<String>,
    /// Known addresses
    #[serde(default)]
    pub addresses: Vec<Address>,
}

const fn default_active() -> bool {
    true
}
