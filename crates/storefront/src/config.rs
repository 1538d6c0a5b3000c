//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_URL`, `BACKEND_ANON_KEY` - Hosted backend (see `parfumerie_backend::BackendConfig`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_CURRENCY` - ISO currency code (default: USD)
//! - `SHIPPING_FLAT_FEE` - Shipping charged below the threshold (default: 5.00)
//! - `FREE_SHIPPING_THRESHOLD` - Order value that ships free (default: 75.00, `off` disables)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use url::Url;

use parfumerie_backend::BackendConfig;
use parfumerie_backend::config::{env_or_default, optional_env, parse_env_or, required_env};
use parfumerie_core::CurrencyCode;
use parfumerie_core::pricing::ShippingPolicy;

pub use parfumerie_backend::ConfigError;

/// Sentry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl SentryConfig {
    pub(crate) fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: optional_env("SENTRY_DSN"),
            environment: optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            traces_sample_rate: parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Currency all prices are quoted in
    pub currency: CurrencyCode,
    /// Shipping fee rules applied at checkout
    pub shipping: ShippingPolicy,
    /// Hosted backend connection
    pub backend: BackendConfig,
    pub sentry: SentryConfig,
}

impl StorefrontConfig {
    /// Default flat shipping fee.
    pub const DEFAULT_FLAT_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);
    /// Default free shipping threshold.
    pub const DEFAULT_FREE_OVER: Decimal = Decimal::from_parts(7500, 0, 0, false, 2);

    /// Configuration with defaults for everything but the backend and base URL.
    #[must_use]
    pub fn new(backend: BackendConfig, base_url: &str) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: base_url.trim_end_matches('/').to_string(),
            currency: CurrencyCode::USD,
            shipping: ShippingPolicy {
                flat_fee: Self::DEFAULT_FLAT_FEE,
                free_over: Some(Self::DEFAULT_FREE_OVER),
            },
            backend,
            sentry: SentryConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let host = env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env_or("STOREFRONT_PORT", 3000_u16)?;
        let base_url = required_env("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let currency = CurrencyCode::from_str(&env_or_default("STORE_CURRENCY", "USD"))
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e))?;

        let shipping = ShippingPolicy {
            flat_fee: parse_env_or("SHIPPING_FLAT_FEE", Self::DEFAULT_FLAT_FEE)?,
            free_over: free_shipping_threshold(optional_env("FREE_SHIPPING_THRESHOLD"))?,
        };

        let mut config = Self::new(BackendConfig::from_env()?, &base_url);
        config.host = host;
        config.port = port;
        config.currency = currency;
        config.shipping = shipping;
        config.sentry = SentryConfig::from_env()?;
        Ok(config)
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

fn free_shipping_threshold(raw: Option<String>) -> Result<Option<Decimal>, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None => Ok(Some(StorefrontConfig::DEFAULT_FREE_OVER)),
        Some("off" | "none") => Ok(None),
        Some(value) => value.parse::<Decimal>().map(Some).map_err(|e| {
            ConfigError::InvalidEnvVar("FREE_SHIPPING_THRESHOLD".to_string(), e.to_string())
        }),
    }
}

fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate = parse_env_or(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::new(
            BackendConfig::new("https://db.example.test/", "anon"),
            "https://shop.example.test/",
        );
        assert_eq!(config.base_url, "https://shop.example.test");
        assert_eq!(config.socket_addr().port(), 3000);
        assert_eq!(config.shipping.flat_fee, Decimal::new(500, 2));
        assert_eq!(config.shipping.free_over, Some(Decimal::new(7500, 2)));
        assert!(config.is_secure());
    }

    #[test]
    fn test_plain_http_is_not_secure() {
        let config = StorefrontConfig::new(
            BackendConfig::new("http://localhost:54321", "anon"),
            "http://localhost:3000",
        );
        assert!(!config.is_secure());
    }

    #[test]
    fn test_free_shipping_threshold_parsing() {
        assert_eq!(
            free_shipping_threshold(None).unwrap(),
            Some(Decimal::new(7500, 2))
        );
        assert_eq!(free_shipping_threshold(Some("off".into())).unwrap(), None);
        assert_eq!(
            free_shipping_threshold(Some(" 120 ".into())).unwrap(),
            Some(Decimal::from(120))
        );
        assert!(matches!(
            free_shipping_threshold(Some("lots".into())),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }
}
