//! Bearer-token authentication against the local session store.

use crate::service::CustomerService;
use futures::future::BoxFuture;
use storefront_core::ServiceError;
use storefront_web::{AuthContext, Authenticator, BearerToken};

/// Resolves `Authorization: Bearer <token>` through [`CustomerService::verify`].
#[derive(Clone)]
pub struct SessionAuthenticator {
    service: CustomerService,
}

impl SessionAuthenticator {
    /// Create an authenticator over the service's session store.
    #[must_use]
    pub const fn new(service: CustomerService) -> Self {
        Self { service }
    }
}

impl Authenticator for SessionAuthenticator {
    fn authenticate<'a>(
        &'a self,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<AuthContext, ServiceError>> {
        Box::pin(async move {
            let BearerToken(token) = BearerToken::parse(credential)
                .map_err(|_| ServiceError::Unauthorized("expected a bearer token".to_string()))?;
            let verified = self.service.verify(&token).await?;
            Ok(AuthContext {
                user_id: verified.customer_id,
                tier: verified.role,
            })
        })
    }
}
