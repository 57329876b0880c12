//! Order status state machine.
//!
//! ```text
//! ORDERED ──ship──▶ SHIPPED ──deliver──▶ DELIVERED
//!    │
//!    └──cancel──▶ CANCELED
//! ```
//!
//! `DELIVERED` and `CANCELED` are terminal. Soft-delete is only allowed from a
//! terminal status and leaves the status unchanged.

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of an order in its lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order has been placed and awaits shipment
    Ordered,
    /// Order is on its way
    Shipped,
    /// Order reached the customer
    Delivered,
    /// Order was canceled before shipping
    Canceled,
}

impl OrderStatus {
    /// Wire and storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordered => "ORDERED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Whether no further status change is defined
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDERED" => Ok(Self::Ordered),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELED" => Ok(Self::Canceled),
            other => Err(ServiceError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

/// An operation that changes an existing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `ORDERED → SHIPPED`
    Ship,
    /// `SHIPPED → DELIVERED`
    Deliver,
    /// `ORDERED → CANCELED`
    Cancel,
    /// `DELIVERED | CANCELED`, status unchanged, `deleted = true`
    SoftDelete,
}

impl Transition {
    /// Operation name used in conflict messages and metrics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ship => "ship",
            Self::Deliver => "deliver",
            Self::Cancel => "cancel",
            Self::SoftDelete => "delete",
        }
    }

    /// Statuses this operation may start from
    #[must_use]
    pub const fn allowed_from(self) -> &'static [OrderStatus] {
        match self {
            Self::Ship | Self::Cancel => &[OrderStatus::Ordered],
            Self::Deliver => &[OrderStatus::Shipped],
            Self::SoftDelete => &[OrderStatus::Delivered, OrderStatus::Canceled],
        }
    }

    /// Validates `current` against the transition table.
    ///
    /// Returns the status the order holds after the operation.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::StateConflict`] when `current` is not a valid
    /// source status for this operation.
    pub fn check(self, current: OrderStatus) -> Result<OrderStatus, ServiceError> {
        if !self.allowed_from().contains(&current) {
            return Err(self.conflict(current));
        }

        Ok(match self {
            Self::Ship => OrderStatus::Shipped,
            Self::Deliver => OrderStatus::Delivered,
            Self::Cancel => OrderStatus::Canceled,
            Self::SoftDelete => current,
        })
    }

    /// The conflict reported when this operation meets an order in `current`.
    #[must_use]
    pub fn conflict(self, current: OrderStatus) -> ServiceError {
        ServiceError::StateConflict {
            operation: self.name(),
            current,
            required: self.allowed_from().to_vec(),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
