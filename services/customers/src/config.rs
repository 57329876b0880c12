//! Configuration for the customer service.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Customer service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Whole-request deadline in seconds
    pub request_timeout_secs: u64,
    /// Session lifetime in seconds
    pub session_ttl_secs: u64,
    /// `PostgreSQL` configuration, absent to run on the in-memory stores
    pub postgres: Option<PostgresConfig>,
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

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT").and_then(|s| s.parse().ok()).unwrap_or(8001),
            request_timeout_secs: var("REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            session_ttl_secs: var("SESSION_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
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
        }
    }

    /// Address to bind, `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whole-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session lifetime.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.bind_address(), "0.0.0.0:8001");
        assert_eq!(config.session_ttl(), Duration::from_secs(3600));
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("9001".to_string()),
            "SESSION_TTL_SECS" => Some("60".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 9001);
        assert_eq!(config.session_ttl_secs, 60);
    }
}
