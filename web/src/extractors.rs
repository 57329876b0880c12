//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request correlation ID
//! - `Credential`: the raw `Authorization` header, forwarded verbatim downstream
//! - `BearerToken`: the token of an `Authorization: Bearer <token>` header
//! - `AuthContext`: the authenticated caller, set by the authentication middleware
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     credential: Credential,
//!     auth: AuthContext,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, tier = %auth.tier, "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use storefront_core::{CustomerId, Tier};
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Uses the ID stored by the correlation middleware, falls back to the
/// `X-Correlation-ID` header, and generates a new UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Raw `Authorization` header value, empty for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential(pub String);

impl Credential {
    /// The credential as sent by the caller.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(credential) = parts.extensions.get::<Self>() {
            return Ok(credential.clone());
        }

        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(Self(raw))
    }
}

/// Bearer token extracted from `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    /// Parses `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns a 401 [`AppError`] for any other shape.
    pub fn parse(header: &str) -> Result<Self, AppError> {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization format. Expected 'Bearer <token>'"))?
            .trim();

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        Self::parse(header)
    }
}

/// The authenticated caller.
///
/// Inserted into request extensions by
/// [`authenticate`](crate::middleware::authenticate). Extracting it rejects
/// anonymous requests with 401; extract `Option<AuthContext>` to allow them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Authenticated customer
    pub user_id: CustomerId,
    /// Resolved membership tier
    pub tier: Tier,
}

impl AuthContext {
    /// Whether the caller may act on `customer_id`'s resources.
    #[must_use]
    pub fn may_act_for(&self, customer_id: CustomerId) -> bool {
        self.user_id == customer_id || self.tier.is_admin()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap();
        req.extensions_mut().insert(stored);

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_credential_is_forwarded_verbatim() {
        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer abc.def")
            .body(())
            .unwrap();

        let (mut parts, ()) = req.into_parts();
        let credential = Credential::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(credential.as_str(), "Bearer abc.def");
    }

    #[tokio::test]
    async fn test_credential_defaults_to_empty() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let credential = Credential::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(credential, Credential::default());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(BearerToken::parse("Bearer tok").unwrap().0, "tok");
        assert!(BearerToken::parse("Basic dXNlcg==").is_err());
        assert!(BearerToken::parse("Bearer   ").is_err());
    }

    #[tokio::test]
    async fn test_missing_auth_context_is_unauthorized() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let err = AuthContext::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_admin_may_act_for_anyone() {
        let admin = AuthContext {
            user_id: CustomerId::generate(),
            tier: Tier::admin(),
        };
        let member = AuthContext {
            user_id: CustomerId::generate(),
            tier: Tier::premium(),
        };

        assert!(admin.may_act_for(member.user_id));
        assert!(member.may_act_for(member.user_id));
        assert!(!member.may_act_for(admin.user_id));
    }
}
