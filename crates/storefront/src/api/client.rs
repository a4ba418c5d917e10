//! Velorm API client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP and `serde_json` for the loosely typed
//! envelopes. Caches products and categories using `moka`.

use std::sync::Arc;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, instrument};
use url::Url;

use velorm_core::{CartAction, Contact, ProductId, UserId};

use crate::api::ApiError;
use crate::api::cache::{CacheKey, CacheValue};
use crate::api::types::{
    AuthenticateRequest, Category, Envelope, OtpRequest, Product, ProfileUpdate,
};
use crate::checkout::OrderPayload;
use crate::config::StorefrontConfig;
use crate::models::{OrderRecord, User};

const DEFAULT_OTP_SEND_ERROR: &str = "Failed to send OTP";
const DEFAULT_OTP_VERIFY_ERROR: &str = "Invalid OTP";
const DEFAULT_PROFILE_ERROR: &str = "Failed to update details";
const DEFAULT_ORDER_ERROR: &str = "Failed to create order";

/// Maximum number of body characters written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// VelormClient
// =============================================================================

/// Client for the Velorm REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and catalog cache.
#[derive(Clone)]
pub struct VelormClient {
    inner: Arc<VelormClientInner>,
}

struct VelormClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, CacheValue>,
}

impl VelormClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(VelormClientInner {
                client,
                base_url: Url::parse(&config.api_base_url)?,
                cache,
            }),
        })
    }

    /// The API base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncate(&response_text, LOG_BODY_LIMIT),
                "Velorm API returned non-success status"
            );
            let message = serde_json::from_str::<Envelope>(&response_text)
                .ok()
                .and_then(|e| e.message().map(str::to_owned))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .map_or_else(|| truncate(&response_text, 200), str::to_owned)
                });
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response_text)
    }

    /// Send a request and parse the body as JSON. An empty body is `null`.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<JsonValue, ApiError> {
        let response_text = self.send(request).await?;
        if response_text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&response_text, LOG_BODY_LIMIT),
                "Failed to parse Velorm API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request and parse the standard envelope.
    async fn execute_envelope(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope, ApiError> {
        let value = self.execute(request).await?;
        if value.is_null() {
            return Ok(Envelope::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    fn get(&self, segments: &[&str]) -> reqwest::RequestBuilder {
        self.inner.client.get(self.endpoint(segments))
    }

    fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> reqwest::RequestBuilder {
        self.inner.client.post(self.endpoint(segments)).json(body)
    }

    // =========================================================================
    // Login Methods
    // =========================================================================

    /// Ask the backend to send a one-time password to `contact`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` with the server message if the backend
    /// refuses, or a transport error.
    #[instrument(skip(self), fields(contact = %contact))]
    pub async fn send_otp(&self, contact: &Contact) -> Result<(), ApiError> {
        let request = self.post(
            &["login", "otp-by-contact"],
            &OtpRequest {
                contact: contact.as_str(),
            },
        );
        let envelope = self.execute_envelope(request).await?;

        if envelope.is_rejected() {
            return Err(envelope.rejection(DEFAULT_OTP_SEND_ERROR));
        }
        Ok(())
    }

    /// Verify a one-time password and return the authenticated user.
    ///
    /// The user is read from `details`, falling back to `response`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` (default message `Invalid OTP`) unless
    /// the backend reports success with a user carrying an id.
    #[instrument(skip(self, otp), fields(contact = %contact))]
    pub async fn authenticate(
        &self,
        contact: &Contact,
        otp: &SecretString,
    ) -> Result<User, ApiError> {
        let request = self.post(
            &["login", "authenticate"],
            &AuthenticateRequest {
                contact: contact.as_str(),
                otp: otp.expose_secret(),
            },
        );
        let envelope = self.execute_envelope(request).await?;

        if !envelope.is_success() {
            return Err(envelope.rejection(DEFAULT_OTP_VERIFY_ERROR));
        }

        let payload = envelope
            .details_or_response()
            .ok_or_else(|| envelope.rejection(DEFAULT_OTP_VERIFY_ERROR))?;
        let user: User = serde_json::from_value(payload.clone())?;
        if user.id.is_empty() {
            return Err(envelope.rejection(DEFAULT_OTP_VERIFY_ERROR));
        }

        debug!(user_id = %user.id, "OTP verified");
        Ok(user)
    }

    /// Submit profile details and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` (default message `Failed to update
    /// details`) unless the backend reports success with a user.
    #[instrument(skip(self, details), fields(contact = %details.contact))]
    pub async fn add_user_details(&self, details: &ProfileUpdate) -> Result<User, ApiError> {
        let request = self.post(&["login", "add-user-details"], details);
        let envelope = self.execute_envelope(request).await?;

        if !envelope.is_success() {
            return Err(envelope.rejection(DEFAULT_PROFILE_ERROR));
        }

        envelope
            .parse_response::<User>()?
            .ok_or_else(|| envelope.rejection(DEFAULT_PROFILE_ERROR))
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the raw cart entries for a user or guest id.
    ///
    /// Returns `None` when the backend has no cart (`response` null or absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: &UserId) -> Result<Option<JsonValue>, ApiError> {
        let request = self.get(&["cart", "get-cart-by-user", user_id.as_str()]);
        let envelope = self.execute_envelope(request).await?;
        Ok(envelope.response().cloned())
    }

    /// Add or adjust a product in the cart.
    ///
    /// The body is `product_data` (if any) with an `inc` or `dec` flag set.
    /// Returns the raw `response`, which is either a cart document or a bare
    /// product, or `None` when the backend returns nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, product_data), fields(product_id = %product_id, user_id = %user_id, action = %action))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
        product_data: Option<&JsonValue>,
        action: CartAction,
    ) -> Result<Option<JsonValue>, ApiError> {
        let body = cart_mutation_body(product_data, action);
        let request = self.post(
            &["cart", "add-to-cart", product_id.as_str(), user_id.as_str()],
            &body,
        );
        let envelope = self.execute_envelope(request).await?;
        Ok(envelope.response().cloned())
    }

    /// Remove a product from the cart.
    ///
    /// The backend exposes deletion as a GET; the response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn delete_from_cart(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
    ) -> Result<(), ApiError> {
        let request = self.get(&[
            "cart",
            "delete-to-cart",
            product_id.as_str(),
            user_id.as_str(),
        ]);
        self.send(request).await?;
        Ok(())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Submit an order and return the backend's confirmation document.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` if `baseResponse.status` signals failure,
    /// or a transport error.
    #[instrument(skip(self, payload), fields(user_id = %payload.user.id, amount = %payload.amount))]
    pub async fn create_order(&self, payload: &OrderPayload) -> Result<JsonValue, ApiError> {
        let request = self.post(&["order", "create-new-order"], payload);
        let confirmation = self.execute(request).await?;

        if confirmation.is_object() {
            let envelope: Envelope = serde_json::from_value(confirmation.clone())?;
            if envelope.is_rejected() {
                return Err(envelope.rejection(DEFAULT_ORDER_ERROR));
            }
        }
        Ok(confirmation)
    }

    /// List every order the backend knows about.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<OrderRecord>, ApiError> {
        let envelope = self
            .execute_envelope(self.get(&["order", "get-all-orders"]))
            .await?;
        Ok(envelope
            .parse_response::<Vec<OrderRecord>>()?
            .unwrap_or_default())
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, ApiError> {
        let cache_key = CacheKey::Products.as_key();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let envelope = self
            .execute_envelope(self.get(&["product", "get-all-products"]))
            .await?;
        let products = Arc::new(envelope.parse_response::<Vec<Product>>()?.unwrap_or_default());

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Arc<Vec<Category>>, ApiError> {
        let cache_key = CacheKey::Categories.as_key();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let envelope = self
            .execute_envelope(self.get(&["category", "get-all-categories"]))
            .await?;
        let categories = Arc::new(
            envelope
                .parse_response::<Vec<Category>>()?
                .unwrap_or_default(),
        );

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(Arc::clone(&categories)))
            .await;

        Ok(categories)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the backend returns no product, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(slug.to_string()).as_key();

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let envelope = self
            .execute_envelope(self.get(&["product", "get-product-by-slug", slug]))
            .await?;
        let product = envelope
            .parse_response::<Product>()?
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {slug}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop every cached catalog response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Drop the cached product for `slug`.
    pub async fn invalidate_product(&self, slug: &str) {
        self.inner
            .cache
            .invalidate(&CacheKey::Product(slug.to_string()).as_key())
            .await;
    }
}

/// Build the add-to-cart body: `product_data` plus an `inc`/`dec` flag.
fn cart_mutation_body(product_data: Option<&JsonValue>, action: CartAction) -> JsonValue {
    let mut body = match product_data {
        Some(JsonValue::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    body.remove("inc");
    body.remove("dec");
    let flag = match action {
        CartAction::Inc => "inc",
        CartAction::Dec => "dec",
    };
    body.insert(flag.to_string(), JsonValue::Bool(true));
    JsonValue::Object(body)
}

fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base: &str) -> VelormClient {
        VelormClient::new(&StorefrontConfig {
            api_base_url: base.to_string(),
            ..StorefrontConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client("https://api.velorm.com/api/v1");
        let url = client.endpoint(&["cart", "get-cart-by-user", "guest_abc_1"]);
        assert_eq!(
            url.as_str(),
            "https://api.velorm.com/api/v1/cart/get-cart-by-user/guest_abc_1"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client("http://localhost:8080/api/v1");
        let url = client.endpoint(&["product", "get-product-by-slug", "rose/oud"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/product/get-product-by-slug/rose%2Foud"
        );
    }

    #[test]
    fn test_cart_mutation_body_merges_product_data() {
        let data = json!({"name": "Rooh Gulab", "price": 450, "dec": true});
        let body = cart_mutation_body(Some(&data), CartAction::Inc);
        assert_eq!(body, json!({"name": "Rooh Gulab", "price": 450, "inc": true}));
    }

    #[test]
    fn test_cart_mutation_body_flags_only() {
        assert_eq!(
            cart_mutation_body(None, CartAction::Dec),
            json!({"dec": true})
        );
        assert_eq!(
            cart_mutation_body(Some(&json!("ignored")), CartAction::Inc),
            json!({"inc": true})
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
