//! Backend connection settings and shared environment helpers.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKEND_URL` - Base URL of the hosted service (e.g. `https://abc.example.co`)
//! - `BACKEND_ANON_KEY` - Public API key sent as `apikey`
//!
//! ## Optional
//! - `BACKEND_CACHE_TTL_SECS` - Query cache time-to-live (default: 60)
//! - `BACKEND_CACHE_CAPACITY` - Query cache entry limit (default: 1000)
//! - `BACKEND_SERVICE_ROLE_KEY` - Privileged key, only loaded by operator tooling
//!
//! The helpers below are also used by the service binaries so every crate
//! reports configuration problems the same way.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Connection settings for the hosted backend.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct BackendConfig {
    /// Service base URL without a trailing slash
    pub url: String,
    /// Public API key (sent on every request)
    pub anon_key: SecretString,
    /// Privileged key that bypasses row-level security
    pub service_role_key: Option<SecretString>,
    /// How long cached reads stay valid
    pub cache_ttl: Duration,
    /// Maximum number of cached reads
    pub cache_capacity: u64,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl BackendConfig {
    /// Default cache time-to-live in seconds.
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;
    /// Default cache capacity.
    pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

    /// Settings for `url` and `anon_key` with default cache limits.
    #[must_use]
    pub fn new(url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: SecretString::from(anon_key.into()),
            service_role_key: None,
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_SECS),
            cache_capacity: Self::DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Load connection settings from environment variables.
    ///
    /// Does not read `BACKEND_SERVICE_ROLE_KEY`; see [`Self::with_service_role_from_env`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let url = required_env("BACKEND_URL")?;
        Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

        let mut config = Self::new(&url, required_env("BACKEND_ANON_KEY")?);
        config.cache_ttl = Duration::from_secs(parse_env_or(
            "BACKEND_CACHE_TTL_SECS",
            Self::DEFAULT_CACHE_TTL_SECS,
        )?);
        config.cache_capacity =
            parse_env_or("BACKEND_CACHE_CAPACITY", Self::DEFAULT_CACHE_CAPACITY)?;
        Ok(config)
    }

    /// Also load and validate `BACKEND_SERVICE_ROLE_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the key is missing, a placeholder, or has
    /// too little entropy.
    pub fn with_service_role_from_env(mut self) -> Result<Self, ConfigError> {
        self.service_role_key = Some(validated_secret("BACKEND_SERVICE_ROLE_KEY")?);
        Ok(self)
    }

    /// Whether the anon key is set at all.
    #[must_use]
    pub fn has_anon_key(&self) -> bool {
        !self.anon_key.expose_secret().is_empty()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if unset.
pub fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable; empty values count as unset.
#[must_use]
pub fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
#[must_use]
pub fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the value is set but does not parse.
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Key length never approaches f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` describing the problem.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
///
/// # Errors
///
/// Returns `ConfigError` if missing or weak.
pub fn validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_placeholder_key_rejected() {
        let err = validate_secret_strength("your-service-role-key", "KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_key_rejected() {
        assert!(validate_secret_strength("abababababababababab", "KEY").is_err());
    }

    #[test]
    fn test_random_key_accepted() {
        assert!(validate_secret_strength("eyJhbGciOiJIUzI1NiJ9.q7Zk2Lw9vR", "KEY").is_ok());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = BackendConfig::new("https://db.parfumerie.test/", "anon");
        assert_eq!(config.url, "https://db.parfumerie.test");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.has_anon_key());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let mut config = BackendConfig::new("https://db.parfumerie.test", "anon-key-value");
        config.service_role_key = Some(SecretString::from("service-key-value"));
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("db.parfumerie.test"));
        assert!(!debug_output.contains("anon-key-value"));
        assert!(!debug_output.contains("service-key-value"));
    }
}
