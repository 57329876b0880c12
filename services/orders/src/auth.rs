//! Authentication backed by the customer service.

use crate::lookup::HttpCustomerLookup;
use futures::future::BoxFuture;
use std::sync::Arc;
use storefront_core::ServiceError;
use storefront_web::{AuthContext, Authenticator};

/// Resolves credentials by asking the customer service's `/verify` endpoint.
#[derive(Debug, Clone)]
pub struct CustomerServiceAuthenticator {
    lookup: Arc<HttpCustomerLookup>,
}

impl CustomerServiceAuthenticator {
    /// Create an authenticator sharing the lookup client's transport.
    #[must_use]
    pub const fn new(lookup: Arc<HttpCustomerLookup>) -> Self {
        Self { lookup }
    }
}

impl Authenticator for CustomerServiceAuthenticator {
    fn authenticate<'a>(
        &'a self,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<AuthContext, ServiceError>> {
        Box::pin(async move {
            let verified = self.lookup.verify(credential).await?;
            Ok(AuthContext {
                user_id: verified.customer_id,
                tier: verified.role,
            })
        })
    }
}
