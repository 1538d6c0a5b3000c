//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin API
//! - `BACKEND_URL`, `BACKEND_ANON_KEY` - Hosted backend
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_LOW_STOCK_THRESHOLD` - Dashboard low-stock cut-off (default: 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)
//!
//! Staff act with their own access tokens, so the admin needs no service
//! role key.

use std::net::{IpAddr, SocketAddr};

use url::Url;

use parfumerie_backend::BackendConfig;
use parfumerie_backend::config::{env_or_default, optional_env, parse_env_or, required_env};

pub use parfumerie_backend::ConfigError;

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin API
    pub base_url: String,
    /// Variants at or below this stock level are flagged on the dashboard
    pub low_stock_threshold: i32,
    /// Hosted backend connection
    pub backend: BackendConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

    /// Configuration with defaults for everything but the backend and base URL.
    #[must_use]
    pub fn new(backend: BackendConfig, base_url: &str) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            base_url: base_url.trim_end_matches('/').to_string(),
            low_stock_threshold: Self::DEFAULT_LOW_STOCK_THRESHOLD,
            backend,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or("ADMIN_PORT", 3001_u16)?;
        let base_url = required_env("ADMIN_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("ADMIN_BASE_URL".to_string(), e.to_string())
        })?;

        let low_stock_threshold =
            parse_env_or("ADMIN_LOW_STOCK_THRESHOLD", Self::DEFAULT_LOW_STOCK_THRESHOLD)?;
        if low_stock_threshold < 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_LOW_STOCK_THRESHOLD".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            low_stock_threshold,
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
            ..Self::new(BackendConfig::from_env()?, &base_url)
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdminConfig::new(
            BackendConfig::new("https://db.example.test", "anon"),
            "https://admin.example.test/",
        );
        assert_eq!(config.base_url, "https://admin.example.test");
        assert_eq!(config.socket_addr().port(), 3001);
        assert_eq!(config.low_stock_threshold, 5);
        assert!(config.is_secure());
        assert!(config.sentry_dsn.is_none());
    }
}
