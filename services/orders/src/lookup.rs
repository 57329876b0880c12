//! HTTP client for the customer service.
//!
//! Every call is a single round trip bounded by the configured timeout. No
//! caching and no retries.

use crate::metrics;
use futures::future::BoxFuture;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use storefront_core::lookup::CustomerLookup;
use storefront_core::{CustomerId, CustomerSnapshot, LookupError, ServiceError, Tier};

/// Identity returned by the customer service for a valid credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// Customer owning the credential
    pub customer_id: CustomerId,
    /// The customer's tier
    pub role: Tier,
}

/// Customer service client.
#[derive(Debug, Clone)]
pub struct HttpCustomerLookup {
    client: Client,
    base_url: String,
}

impl HttpCustomerLookup {
    /// Create a client for `base_url` whose calls give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, path: &str, credential: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(CONTENT_TYPE, "application/json");

        if credential.is_empty() {
            request
        } else {
            request.header(AUTHORIZATION, credential)
        }
    }

    async fn fetch(&self, id: CustomerId, credential: &str) -> Result<CustomerSnapshot, LookupError> {
        let response = self
            .get(&format!("/customer/{id}"), credential)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if response.status() != StatusCode::OK {
            tracing::debug!(customer_id = %id, status = %response.status(), "Customer lookup miss");
            return Err(LookupError::NotFound(id));
        }

        response
            .json::<CustomerSnapshot>()
            .await
            .map_err(|e| LookupError::Transport(format!("undecodable customer body: {e}")))
    }

    /// Resolve a credential into the customer it belongs to.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthorized`]: the customer service rejects the credential
    /// - [`ServiceError::DependencyFailure`]: the customer service is unreachable or misbehaves
    pub async fn verify(&self, credential: &str) -> Result<Verification, ServiceError> {
        let response = self
            .get("/verify", credential)
            .send()
            .await
            .map_err(|e| ServiceError::DependencyFailure(format!("customer service unreachable: {e}")))?;

        match response.status() {
            StatusCode::OK => response.json::<Verification>().await.map_err(|e| {
                ServiceError::DependencyFailure(format!("undecodable verification body: {e}"))
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(ServiceError::Unauthorized("invalid or expired credential".to_string()))
            }
            status => Err(ServiceError::DependencyFailure(format!(
                "customer service answered {status} to verification"
            ))),
        }
    }
}

impl CustomerLookup for HttpCustomerLookup {
    fn fetch_customer<'a>(
        &'a self,
        id: CustomerId,
        credential: &'a str,
    ) -> BoxFuture<'a, Result<CustomerSnapshot, LookupError>> {
        Box::pin(async move {
            let started = Instant::now();
            let result = self.fetch(id, credential).await;

            let outcome = match &result {
                Ok(_) => "found",
                Err(LookupError::NotFound(_)) => "not_found",
                Err(LookupError::Transport(reason)) => {
                    tracing::error!(customer_id = %id, error = %reason, "Customer lookup failed");
                    "transport_error"
                }
            };
            metrics::record_customer_lookup(outcome, started.elapsed().as_secs_f64());

            result
        })
    }
}
