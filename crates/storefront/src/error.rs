//! Unified error handling with Sentry integration.
//!
//! Provides a unified `StoreError` type returned by every store operation,
//! plus helpers that attach user context and breadcrumbs to Sentry. The
//! Sentry helpers are no-ops until the binary initialises a Sentry client.

use thiserror::Error;

use velorm_core::{ContactError, EmailError, ProductId};

use crate::api::ApiError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::normalize::NormalizeError;
use crate::pricing::PricingError;
use crate::storage::StorageError;

/// Application-level error type for the storefront stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Local storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A cart response had an unrecognised shape.
    #[error("Cart response error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Checkout was refused before submission.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Cart totals could not be computed.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Contact number failed validation.
    #[error("Invalid contact number: {0}")]
    Contact(#[from] ContactError),

    /// Email failed validation.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// The product is not in the local cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// The operation needs an authenticated user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl StoreError {
    /// Message suitable for showing to a shopper.
    ///
    /// Server rejections are passed through verbatim; transport and internal
    /// failures get a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Rejected(message)) => message.clone(),
            Self::Api(ApiError::NotFound(_)) => "Not found".to_string(),
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests, please try again in {secs} seconds")
            }
            Self::Api(_) | Self::Normalize(_) => {
                "Something went wrong, please try again".to_string()
            }
            Self::Storage(_) | Self::Config(_) => "Internal error".to_string(),
            Self::Checkout(e) => e.to_string(),
            Self::Pricing(e) => e.to_string(),
            Self::Contact(e) => format!("Invalid contact number: {e}"),
            Self::Email(e) => format!("Invalid email: {e}"),
            Self::NotInCart(_) => "That item is not in your cart".to_string(),
            Self::Unauthorized(message) => message.clone(),
        }
    }

    /// Whether this error is worth reporting to Sentry.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(
            self,
            Self::Api(
                ApiError::Http(_)
                    | ApiError::Status { .. }
                    | ApiError::Parse(_)
                    | ApiError::InvalidBaseUrl(_)
            ) | Self::Storage(_)
                | Self::Normalize(_)
                | Self::Config(_)
        )
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Capture a reportable error to Sentry and log it.
pub fn report(error: &StoreError) {
    if error.is_reportable() {
        let event_id = sentry::capture_error(error);
        tracing::error!(
            error = %error,
            sentry_event_id = %event_id,
            "Store operation failed"
        );
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p-1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
