//! Error taxonomy shared by the storefront services.
//!
//! [`ServiceError`] is what engines return; the web layer maps each variant to
//! a status code and a stable machine code. [`StoreError`] and [`LookupError`]
//! are the narrower errors of the store and lookup seams.

use crate::status::OrderStatus;
use crate::types::CustomerId;
use thiserror::Error;

/// Errors returned by service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed identifier or request body.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Order or customer absent.
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of resource that was looked up
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Illegal status transition, or a concurrent transition won the race.
    #[error("Cannot {operation} order while it is in '{current}' status.")]
    StateConflict {
        /// Operation that was attempted
        operation: &'static str,
        /// Status the order holds
        current: OrderStatus,
        /// Statuses the operation may start from
        required: Vec<OrderStatus>,
    },

    /// Missing or rejected credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the required tier.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A unique key is already taken.
    #[error("{resource} already exists: {key}")]
    AlreadyExists {
        /// Kind of resource
        resource: &'static str,
        /// Conflicting key
        key: String,
    },

    /// A remote dependency could not be reached.
    #[error("dependency failure: {0}")]
    DependencyFailure(String),

    /// Unexpected store or programming failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::StateConflict { .. } => "STATE_CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::DependencyFailure(_) => "DEPENDENCY_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for an absent order.
    #[must_use]
    pub fn order_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "Order",
            id: id.to_string(),
        }
    }

    /// Shorthand for an absent customer.
    #[must_use]
    pub fn customer_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            resource: "Customer",
            id: id.to_string(),
        }
    }
}

/// Errors raised by store implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection or query failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Stored document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A unique constraint was violated.
    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Errors raised by the customer lookup client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The customer service answered with a non-success status.
    #[error("customer {0} not found")]
    NotFound(CustomerId),

    /// The customer service could not be reached or misbehaved.
    #[error("customer service unreachable: {0}")]
    Transport(String),
}

impl From<LookupError> for ServiceError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(id) => Self::customer_not_found(id),
            LookupError::Transport(message) => Self::DependencyFailure(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ServiceError::InvalidInput(String::new()).code(), "INVALID_INPUT");
        assert_eq!(ServiceError::order_not_found("x").code(), "NOT_FOUND");
        assert_eq!(ServiceError::DependencyFailure(String::new()).code(), "DEPENDENCY_FAILURE");
        assert_eq!(ServiceError::Internal(String::new()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_lookup_errors_stay_distinct() {
        let id = CustomerId::generate();
        assert_eq!(
            ServiceError::from(LookupError::NotFound(id)),
            ServiceError::customer_not_found(id)
        );
        assert!(matches!(
            ServiceError::from(LookupError::Transport("refused".to_string())),
            ServiceError::DependencyFailure(_)
        ));
    }

    #[test]
    fn test_store_errors_are_internal() {
        let err = ServiceError::from(StoreError::Database("pool closed".to_string()));
        assert_eq!(err.to_string(), "internal error: Database error: pool closed");
    }
}
