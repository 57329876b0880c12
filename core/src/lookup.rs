//! Customer lookup seam used by the order service.

use crate::error::LookupError;
use crate::types::{CustomerId, CustomerSnapshot};
use futures::future::BoxFuture;

/// Fetches customer snapshots from the customer service.
///
/// Every call is a fresh round trip: implementations neither cache nor retry.
pub trait CustomerLookup: Send + Sync {
    /// Fetches a customer, forwarding `credential` verbatim (empty means
    /// anonymous).
    ///
    /// # Errors
    ///
    /// - [`LookupError::NotFound`]: the service answered with a non-success status
    /// - [`LookupError::Transport`]: the service could not be reached in time
    fn fetch_customer<'a>(
        &'a self,
        id: CustomerId,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<CustomerSnapshot, LookupError>>;
}
