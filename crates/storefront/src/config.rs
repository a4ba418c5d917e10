//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `VELORM_API_BASE_URL` - Remote API base (default: `https://api.velorm.com/api/v1`)
//! - `VELORM_STORAGE_DIR` - Directory for persisted session state (default: `.velorm`)
//! - `VELORM_SHIPPING_FEE` - Flat shipping fee added at checkout (default: 5.00)
//! - `VELORM_CURRENCY` - Display currency: INR, USD, EUR or GBP (default: INR)
//! - `VELORM_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `VELORM_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use velorm_core::CurrencyCode;

/// Default remote API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.velorm.com/api/v1";
const DEFAULT_STORAGE_DIR: &str = ".velorm";
const DEFAULT_SHIPPING_FEE: &str = "5.00";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the Sentry DSN.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Remote API base URL, without a trailing slash
    pub api_base_url: String,
    /// Directory holding persisted session state
    pub storage_dir: PathBuf,
    /// Flat shipping fee added to every order
    pub shipping_fee: Decimal,
    /// Currency used for display
    pub currency: CurrencyCode,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Catalog cache time-to-live
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url)
            .field("storage_dir", &self.storage_dir)
            .field("shipping_fee", &self.shipping_fee)
            .field("currency", &self.currency)
            .field("request_timeout", &self.request_timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field(
                "sentry_dsn",
                &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            shipping_fee: Decimal::new(500, 2),
            currency: CurrencyCode::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = parse_base_url(
            "VELORM_API_BASE_URL",
            &get_env_or_default(&lookup, "VELORM_API_BASE_URL", DEFAULT_API_BASE_URL),
        )?;
        let storage_dir = PathBuf::from(get_env_or_default(
            &lookup,
            "VELORM_STORAGE_DIR",
            DEFAULT_STORAGE_DIR,
        ));

        let shipping_fee: Decimal = parse_env(
            "VELORM_SHIPPING_FEE",
            &get_env_or_default(&lookup, "VELORM_SHIPPING_FEE", DEFAULT_SHIPPING_FEE),
        )?;
        if shipping_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "VELORM_SHIPPING_FEE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let currency = match get_optional_env(&lookup, "VELORM_CURRENCY") {
            Some(raw) => CurrencyCode::from_str(&raw)
                .map_err(|e| ConfigError::InvalidEnvVar("VELORM_CURRENCY".to_string(), e))?,
            None => CurrencyCode::default(),
        };

        let timeout_secs: u64 = parse_env(
            "VELORM_REQUEST_TIMEOUT_SECS",
            &get_env_or_default(
                &lookup,
                "VELORM_REQUEST_TIMEOUT_SECS",
                &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            ),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "VELORM_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let cache_ttl_secs: u64 = parse_env(
            "VELORM_CATALOG_CACHE_TTL_SECS",
            &get_env_or_default(
                &lookup,
                "VELORM_CATALOG_CACHE_TTL_SECS",
                &DEFAULT_CATALOG_CACHE_TTL_SECS.to_string(),
            ),
        )?;

        Ok(Self {
            api_base_url,
            storage_dir,
            shipping_fee,
            currency,
            request_timeout: Duration::from_secs(timeout_secs),
            catalog_cache_ttl: Duration::from_secs(cache_ttl_secs),
            sentry_dsn: get_optional_env(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional_env(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional, non-blank environment variable.
fn get_optional_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    get_optional_env(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, reporting the key on failure.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate an http(s) base URL and strip trailing slashes.
fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}
