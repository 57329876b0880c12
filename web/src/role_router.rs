//! Role-based routing.
//!
//! One public endpoint is redispatched to an internal handler chosen by the
//! caller's tier. The internal router is never merged into the public one, so
//! the tier-specific paths stay invisible from outside.
//!
//! ```text
//! GET /price/42 ──(tier = premium)──▶ internal GET /internal/price/premium/42
//!               ──(tier = admin, unmapped)──▶ 403
//! ```
//!
//! # Example
//!
//! ```ignore
//! let routes = RoleRoutes::parse("premium=/internal/price/premium/:id")?;
//! let internal = Router::new()
//!     .route("/internal/price/premium/:id", get(premium_price))
//!     .with_state(state);
//! let public = Router::new().merge(role_routed("/price/:id", routes, internal));
//! ```

use crate::error::AppError;
use crate::extractors::{AuthContext, Credential};
use axum::{
    Router,
    extract::{Path, Request, State},
    http::{Uri, uri::PathAndQuery},
    response::{IntoResponse, Response},
    routing::any,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use storefront_core::Tier;
use thiserror::Error;
use tower::ServiceExt;
use uuid::Uuid;

/// Placeholder substituted with the public path's `:id` segment.
pub const ID_PLACEHOLDER: &str = ":id";

/// Errors building a [`RoleRoutes`] table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleRoutesError {
    /// An entry is not of the form `tier=/path/:id`.
    #[error("malformed role route entry '{0}', expected 'tier=/path/:id'")]
    Malformed(String),

    /// A tier appears twice.
    #[error("tier '{0}' is mapped more than once")]
    DuplicateTier(String),
}

/// Immutable tier → internal path template table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRoutes {
    routes: BTreeMap<Tier, String>,
}

impl RoleRoutes {
    /// Builds a table from `(tier, template)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RoleRoutesError`] for a malformed template or a repeated tier.
    pub fn new<I, T, P>(entries: I) -> Result<Self, RoleRoutesError>
    where
        I: IntoIterator<Item = (T, P)>,
        T: Into<String>,
        P: Into<String>,
    {
        let mut routes = BTreeMap::new();
        for (tier, template) in entries {
            let tier = Tier::new(tier.into().trim());
            let template = template.into().trim().to_string();
            if tier.as_str().is_empty()
                || !template.starts_with('/')
                || !template.contains(ID_PLACEHOLDER)
            {
                return Err(RoleRoutesError::Malformed(format!("{tier}={template}")));
            }
            if routes.insert(tier.clone(), template).is_some() {
                return Err(RoleRoutesError::DuplicateTier(tier.to_string()));
            }
        }
        Ok(Self { routes })
    }

    /// Parses `tier=/path/:id,tier=/path/:id`.
    ///
    /// # Errors
    ///
    /// Returns [`RoleRoutesError`] for malformed entries.
    pub fn parse(table: &str) -> Result<Self, RoleRoutesError> {
        let entries = table
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| {
                entry
                    .split_once('=')
                    .ok_or_else(|| RoleRoutesError::Malformed(entry.trim().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    /// Internal path template for `tier`, if mapped.
    #[must_use]
    pub fn template(&self, tier: &Tier) -> Option<&str> {
        self.routes.get(tier).map(String::as_str)
    }

    /// Internal path for `tier` with `id` substituted.
    ///
    /// `id` is the percent-decoded path segment, so it must stay a single
    /// segment once pasted into the template.
    ///
    /// # Errors
    ///
    /// Returns a 403 [`AppError`] when the tier is unmapped and a 400 when `id`
    /// is empty or holds a path, query or escape delimiter.
    pub fn resolve(&self, tier: &Tier, id: &str) -> Result<String, AppError> {
        let template = self
            .template(tier)
            .ok_or_else(|| AppError::forbidden(format!("tier '{tier}' has no access to this resource")))?;
        if id.is_empty() || id.contains(['/', '?', '#', '%']) {
            return Err(AppError::bad_request(format!("invalid identifier '{id}'")));
        }
        Ok(template.replace(ID_PLACEHOLDER, id))
    }

    /// Every internal template, for registering handlers.
    pub fn templates(&self) -> impl Iterator<Item = (&Tier, &str)> {
        self.routes.iter().map(|(tier, template)| (tier, template.as_str()))
    }
}

struct RoleDispatch {
    routes: RoleRoutes,
    internal: Router,
}

/// Builds a router serving `public_path` (which must capture `:id`) by
/// redispatching each request to `internal` according to `routes`.
///
/// Anonymous callers get 401, unmapped tiers 403 and ids that would not stay a
/// single internal path segment 400. A mapped template with no
/// handler in `internal` is a wiring defect and answers 500.
pub fn role_routed(public_path: &str, routes: RoleRoutes, internal: Router) -> Router {
    let dispatch = Arc::new(RoleDispatch {
        routes,
        internal: internal.fallback(unregistered_internal_path),
    });

    Router::new()
        .route(public_path, any(dispatch_by_role))
        .with_state(dispatch)
}

async fn dispatch_by_role(
    State(dispatch): State<Arc<RoleDispatch>>,
    Path(id): Path<String>,
    auth: Option<AuthContext>,
    req: Request,
) -> Result<Response, AppError> {
    let auth = auth.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
    let target = dispatch.routes.resolve(&auth.tier, &id)?;

    let path_and_query = match req.uri().query() {
        Some(query) => format!("{target}?{query}"),
        None => target,
    };
    let uri = PathAndQuery::try_from(path_and_query)
        .map(Uri::from)
        .map_err(|_| AppError::bad_request(format!("invalid identifier '{id}'")))?;

    tracing::debug!(tier = %auth.tier, target = %uri, "Redispatching by role");

    let internal_req = internal_request(req, uri, auth);
    match dispatch.internal.clone().oneshot(internal_req).await {
        Ok(response) => Ok(response),
        Err(never) => match never {},
    }
}

/// Rebuilds `req` for the internal router.
///
/// Extensions are not carried over wholesale: axum appends path parameters to
/// the ones already captured, so only the caller identity and correlation ID
/// travel with the request.
fn internal_request(req: Request, uri: Uri, auth: AuthContext) -> Request {
    let (parts, body) = req.into_parts();

    let mut internal = Request::new(body);
    *internal.method_mut() = parts.method;
    *internal.uri_mut() = uri;
    *internal.version_mut() = parts.version;
    *internal.headers_mut() = parts.headers;

    let extensions = internal.extensions_mut();
    extensions.insert(auth);
    if let Some(credential) = parts.extensions.get::<Credential>() {
        extensions.insert(credential.clone());
    }
    if let Some(correlation_id) = parts.extensions.get::<Uuid>() {
        extensions.insert(*correlation_id);
    }

    internal
}

#[allow(clippy::unused_async)]
async fn unregistered_internal_path(uri: Uri) -> Response {
    AppError::internal("An internal error occurred")
        .with_source(anyhow::anyhow!("no internal handler registered for {uri}"))
        .into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::middleware::correlation_id_layer;
    use axum::{body::Body, http::StatusCode, routing::get};
    use storefront_core::CustomerId;

    fn routes() -> RoleRoutes {
        RoleRoutes::parse(
            "premium=/internal/price/premium/:id, non-premium=/internal/price/non-premium/:id",
        )
        .unwrap()
    }

    fn internal() -> Router {
        Router::new()
            .route(
                "/internal/price/premium/:id",
                get(|Path(id): Path<String>, uri: Uri, auth: AuthContext| async move {
                    format!("{} {id} {uri}", auth.tier)
                }),
            )
            .route(
                "/internal/price/non-premium/:id",
                get(|Path(id): Path<String>| async move { format!("non-premium {id}") }),
            )
    }

    fn app() -> Router {
        role_routed("/price/:id", routes(), internal()).layer(correlation_id_layer())
    }

    fn request_as(tier: Option<&str>, uri: &str) -> Request {
        let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        if let Some(tier) = tier {
            req.extensions_mut().insert(AuthContext {
                user_id: CustomerId::generate(),
                tier: Tier::new(tier),
            });
        }
        req
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_mapped_tier_reaches_exact_internal_path() {
        let response = app().oneshot(request_as(Some("premium"), "/price/42")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "premium 42 /internal/price/premium/42");
    }

    #[tokio::test]
    async fn test_query_string_is_preserved() {
        let response = app()
            .oneshot(request_as(Some("premium"), "/price/7?currency=usd"))
            .await
            .unwrap();

        assert_eq!(body(response).await, "premium 7 /internal/price/premium/7?currency=usd");
    }

    #[tokio::test]
    async fn test_encoded_delimiters_in_id_are_bad_request() {
        for uri in ["/price/a%2Fb", "/price/a%3Fdebug=1", "/price/a%23frag", "/price/a%2525"] {
            let response = app().oneshot(request_as(Some("premium"), uri)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(body(response).await.contains("INVALID_INPUT"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_unmapped_tier_is_forbidden() {
        let response = app().oneshot(request_as(Some("admin"), "/price/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let response = app().oneshot(request_as(None, "/price/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_internal_handler_is_internal_error() {
        let routes = RoleRoutes::new([("gold", "/internal/price/gold/:id")]).unwrap();
        let app = role_routed("/price/:id", routes, internal());

        let response = app.oneshot(request_as(Some("gold"), "/price/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        assert!(matches!(
            RoleRoutes::parse("premium"),
            Err(RoleRoutesError::Malformed(_))
        ));
        assert!(matches!(
            RoleRoutes::parse("premium=/no/placeholder"),
            Err(RoleRoutesError::Malformed(_))
        ));
        assert!(matches!(
            RoleRoutes::parse("premium=/a/:id,premium=/b/:id"),
            Err(RoleRoutesError::DuplicateTier(_))
        ));
    }

    #[test]
    fn test_resolve_substitutes_id() {
        let path = routes().resolve(&Tier::non_premium(), "abc").unwrap();
        assert_eq!(path, "/internal/price/non-premium/abc");

        let err = routes().resolve(&Tier::premium(), "a/b").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = routes().resolve(&Tier::admin(), "a/b").unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
