//! Velorm REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS via `reqwest`; every endpoint lives under the
//!   configured base URL (default `https://api.velorm.com/api/v1`)
//! - The backend is the source of truth; the stores only mirror it
//! - Catalog responses are cached in memory via `moka` (5 minute TTL by default)
//!
//! # Endpoints
//!
//! - `/login/*` - OTP login and profile updates
//! - `/cart/*` - cart reads and mutations for a user or guest id
//! - `/order/*` - order creation and history
//! - `/product/*`, `/category/*` - catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use velorm_storefront::api::VelormClient;
//!
//! let client = VelormClient::new(&config)?;
//! let products = client.get_products().await?;
//! let cart = client.get_cart(&user_id).await?;
//! ```

mod cache;
mod client;
pub mod lenient;
pub mod types;

pub use client::VelormClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the Velorm API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server message or a truncated body.
        message: String,
    },

    /// Backend answered 200 but flagged the request as failed.
    #[error("{0}")]
    Rejected(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The configured base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the failure happened below the application layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::RateLimited(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("rooh-gulab".to_string());
        assert_eq!(err.to_string(), "Not found: rooh-gulab");

        let err = ApiError::Rejected("Invalid OTP".to_string());
        assert_eq!(err.to_string(), "Invalid OTP");

        let err = ApiError::Status {
            status: 502,
            message: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
        assert!(err.is_transport());
        assert!(!ApiError::Rejected(String::new()).is_transport());
    }
}
