//! # Storefront Core
//!
//! Domain types and seams shared by the storefront services.
//!
//! This crate contains no I/O. It defines:
//!
//! - **Types**: orders, line items, addresses, discounts, customers ([`types`], [`customer`])
//! - **Status machine**: the order lifecycle and its transition table ([`status`])
//! - **Pricing**: tier-based discount selection and final price computation ([`pricing`])
//! - **Pagination**: page/limit parsing with silent fallback ([`pagination`])
//! - **Errors**: the value-typed error taxonomy every boundary maps from ([`error`])
//! - **Seams**: store and lookup traits implemented by the `postgres`, `testing`
//!   and service crates ([`store`], [`lookup`], [`environment`])
//!
//! ## Architecture Principles
//!
//! - Pure rules in this crate, I/O behind dyn-compatible traits
//! - Immutable configuration injected at construction
//! - Conditional writes instead of locks for status changes
//!
//! ## Example
//!
//! ```
//! use storefront_core::status::{OrderStatus, Transition};
//!
//! assert_eq!(Transition::Ship.check(OrderStatus::Ordered).ok(), Some(OrderStatus::Shipped));
//! assert!(Transition::Cancel.check(OrderStatus::Delivered).is_err());
//! ```

pub mod customer;
pub mod error;
pub mod lookup;
pub mod pagination;
pub mod pricing;
pub mod status;
pub mod store;
pub mod types;

pub use error::{LookupError, ServiceError, StoreError};
pub use pagination::Pagination;
pub use status::{OrderStatus, Transition};
pub use types::{
    Address, CustomerId, CustomerSnapshot, Discount, DiscountType, LineItem, Money, NewOrder,
    Order, OrderId, Tier,
};

/// Environment traits for dependency injection.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
