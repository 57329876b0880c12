//! Configuration for the order service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Malformed numbers fall back to their default; a malformed `PRICE_ROUTES`
//! table is rejected at startup.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use storefront_web::{RoleRoutes, RoleRoutesError};
use thiserror::Error;

/// Default tier → internal path table for `GET /price/:id`.
pub const DEFAULT_PRICE_ROUTES: &str =
    "premium=/internal/price/premium/:id,non-premium=/internal/price/non-premium/:id";

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `PRICE_ROUTES` could not be parsed.
    #[error("PRICE_ROUTES: {0}")]
    PriceRoutes(#[from] RoleRoutesError),
}

/// Order service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// `PostgreSQL` configuration, absent to run on the in-memory store
    pub postgres: Option<PostgresConfig>,
    /// Customer service client configuration
    pub customer_service: CustomerServiceConfig,
    /// Tier → internal path table, as configured
    pub price_routes: String,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Whole-request deadline in seconds
    pub request_timeout_secs: u64,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

/// Customer service client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerServiceConfig {
    /// Base URL, e.g. `http://localhost:8001`
    pub base_url: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `PRICE_ROUTES` is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `PRICE_ROUTES` is malformed.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: var("PORT").and_then(|s| s.parse().ok()).unwrap_or(8002),
                request_timeout_secs: var("REQUEST_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            postgres: var("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .map(|url| PostgresConfig {
                    url,
                    max_connections: var("DATABASE_MAX_CONNECTIONS")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(10),
                    acquire_timeout_secs: var("DATABASE_ACQUIRE_TIMEOUT_SECS")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5),
                }),
            customer_service: CustomerServiceConfig {
                base_url: var("CUSTOMER_SERVICE_URL")
                    .unwrap_or_else(|| "http://localhost:8001".to_string()),
                timeout_secs: var("CUSTOMER_LOOKUP_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            price_routes: var("PRICE_ROUTES").unwrap_or_else(|| DEFAULT_PRICE_ROUTES.to_string()),
        };

        config.role_routes()?;
        Ok(config)
    }

    /// Parsed tier → internal path table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the table is malformed.
    pub fn role_routes(&self) -> Result<RoleRoutes, ConfigError> {
        Ok(RoleRoutes::parse(&self.price_routes)?)
    }

    /// Address to bind, `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whole-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl CustomerServiceConfig {
    /// Per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
