//! Wire types for the Velorm REST API.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use velorm_core::{CategoryId, ProductId};

use super::{ApiError, lenient};

/// Status value the backend uses in `baseResponse.status` for success.
pub const STATUS_SUCCESS: i64 = 1;

/// Category name shown when a product's category is unknown.
pub const FALLBACK_CATEGORY_NAME: &str = "Collection";

// =============================================================================
// Envelope
// =============================================================================

/// The `baseResponse` block carried by most responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BaseResponse {
    #[serde(default, deserialize_with = "lenient::status_flag")]
    pub status: Option<i64>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub message: Option<String>,
}

/// Standard response envelope: `{ baseResponse, response, details }`.
///
/// Payloads are kept as raw JSON; callers decide how strictly to type them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(rename = "baseResponse", default)]
    pub base_response: Option<BaseResponse>,
    #[serde(default)]
    pub response: Option<JsonValue>,
    #[serde(default)]
    pub details: Option<JsonValue>,
}

impl Envelope {
    /// Whether `baseResponse.status` is the success value.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.base_response
            .as_ref()
            .and_then(|b| b.status)
            .is_some_and(|s| s == STATUS_SUCCESS)
    }

    /// Whether the backend explicitly reported a failure status.
    ///
    /// A missing `baseResponse` is not a rejection.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.base_response
            .as_ref()
            .and_then(|b| b.status)
            .is_some_and(|s| s != STATUS_SUCCESS)
    }

    /// Server-provided message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.base_response
            .as_ref()
            .and_then(|b| b.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }

    /// Build a rejection error from the server message or `default`.
    #[must_use]
    pub fn rejection(&self, default: &str) -> ApiError {
        ApiError::Rejected(self.message().unwrap_or(default).to_string())
    }

    /// The non-null `response` payload.
    #[must_use]
    pub fn response(&self) -> Option<&JsonValue> {
        self.response.as_ref().filter(|v| !v.is_null())
    }

    /// `details` when present, otherwise `response`.
    #[must_use]
    pub fn details_or_response(&self) -> Option<&JsonValue> {
        self.details
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| self.response())
    }

    /// Deserialize the `response` payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the payload does not match `T`.
    pub fn parse_response<T: DeserializeOwned>(&self) -> Result<Option<T>, ApiError> {
        self.response()
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .map_err(ApiError::Parse)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Body for `POST /login/otp-by-contact`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest<'a> {
    pub contact: &'a str,
}

/// Body for `POST /login/authenticate`.
#[derive(Serialize)]
pub struct AuthenticateRequest<'a> {
    pub contact: &'a str,
    pub otp: &'a str,
}

/// Body for `POST /login/add-user-details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub contact: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", deserialize_with = "lenient::id")]
    pub id: ProductId,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub slug: String,
    #[serde(rename = "categoryId", default, deserialize_with = "lenient::optional_id")]
    pub category_id: Option<CategoryId>,
    #[serde(
        default,
        deserialize_with = "lenient::amount_or_zero",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub price: Decimal,
    #[serde(
        rename = "regularPrice",
        default,
        deserialize_with = "lenient::amount_or_zero",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub regular_price: Decimal,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
    #[serde(rename = "productImage", default, deserialize_with = "lenient::images")]
    pub product_image: Vec<String>,
    #[serde(default)]
    pub status: Option<JsonValue>,
}

impl Product {
    /// Regular price, falling back to the sale price when unset.
    #[must_use]
    pub fn list_price(&self) -> Decimal {
        if self.regular_price.is_zero() {
            self.price
        } else {
            self.regular_price
        }
    }

    /// First product image, or empty.
    #[must_use]
    pub fn primary_image(&self) -> &str {
        self.product_image.first().map_or("", String::as_str)
    }

    /// Whether the product is listed as active.
    ///
    /// A missing status counts as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        match &self.status {
            Some(JsonValue::Bool(active)) => *active,
            Some(JsonValue::String(s)) => !s.eq_ignore_ascii_case("inactive"),
            _ => true,
        }
    }

    /// The `productData` body sent to `add-to-cart` for a one-time purchase.
    #[must_use]
    pub fn add_to_cart_payload(&self, now: DateTime<Utc>) -> JsonValue {
        json!({
            "productwithdates": {
                "subscribed_type": "One Time",
                "start_date": now.to_rfc3339_opts(SecondsFormat::Millis, true),
                "membership_offer": false,
                "regularPrice": decimal_to_json(self.list_price()),
                "subscription_dates": "",
                "name": self.name,
                "image": self.primary_image(),
            },
            "price": decimal_to_json(self.price),
            "name": self.name,
        })
    }
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", deserialize_with = "lenient::id")]
    pub id: CategoryId,
    #[serde(
        rename = "categoryName",
        default,
        deserialize_with = "lenient::string_or_empty"
    )]
    pub category_name: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub slug: String,
}

/// Resolve a category id to its display name.
///
/// Unknown or missing ids resolve to [`FALLBACK_CATEGORY_NAME`].
#[must_use]
pub fn category_name<'a>(category_id: Option<&CategoryId>, categories: &'a [Category]) -> &'a str {
    category_id
        .and_then(|id| categories.iter().find(|c| &c.id == id))
        .map_or(FALLBACK_CATEGORY_NAME, |c| c.category_name.as_str())
}

/// Encode a decimal as a JSON number, the way the backend expects prices.
#[must_use]
pub fn decimal_to_json(amount: Decimal) -> JsonValue {
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(JsonValue::Null, JsonValue::Number)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_envelope_success_and_rejection() {
        let ok: Envelope = serde_json::from_value(json!({
            "baseResponse": {"status": 1, "message": "OK"},
            "response": {"_id": "u-1"},
        }))
        .unwrap();
        assert!(ok.is_success());
        assert!(!ok.is_rejected());

        let rejected: Envelope = serde_json::from_value(json!({
            "baseResponse": {"status": 0, "message": "Invalid OTP"},
        }))
        .unwrap();
        assert!(!rejected.is_success());
        assert!(rejected.is_rejected());
        assert_eq!(rejected.rejection("fallback").to_string(), "Invalid OTP");

        let bare: Envelope = serde_json::from_value(json!({"response": []})).unwrap();
        assert!(!bare.is_success());
        assert!(!bare.is_rejected());
    }

    #[test]
    fn test_envelope_rejection_default_message() {
        let rejected: Envelope =
            serde_json::from_value(json!({"baseResponse": {"status": "0", "message": ""}}))
                .unwrap();
        assert_eq!(rejected.rejection("Invalid OTP").to_string(), "Invalid OTP");
    }

    #[test]
    fn test_details_preferred_over_response() {
        let envelope: Envelope = serde_json::from_value(json!({
            "details": {"_id": "from-details"},
            "response": {"_id": "from-response"},
        }))
        .unwrap();
        assert_eq!(envelope.details_or_response().unwrap()["_id"], "from-details");

        let envelope: Envelope = serde_json::from_value(json!({
            "details": null,
            "response": {"_id": "from-response"},
        }))
        .unwrap();
        assert_eq!(envelope.details_or_response().unwrap()["_id"], "from-response");
    }

    #[test]
    fn test_category_name_fallback() {
        let categories = vec![Category {
            id: CategoryId::new("c-1"),
            category_name: "Attar".to_string(),
            slug: "attar".to_string(),
        }];
        assert_eq!(category_name(Some(&CategoryId::new("c-1")), &categories), "Attar");
        assert_eq!(
            category_name(Some(&CategoryId::new("c-2")), &categories),
            FALLBACK_CATEGORY_NAME
        );
        assert_eq!(category_name(None, &categories), FALLBACK_CATEGORY_NAME);
    }

    #[test]
    fn test_add_to_cart_payload() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p-1",
            "name": "Rooh Gulab",
            "slug": "rooh-gulab",
            "price": 450,
            "productImage": ["rose.jpg", "rose-2.jpg"],
        }))
        .unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        let payload = product.add_to_cart_payload(now);
        let dates = &payload["productwithdates"];
        assert_eq!(dates["subscribed_type"], "One Time");
        assert_eq!(dates["start_date"], "2026-01-02T03:04:05.000Z");
        assert_eq!(dates["membership_offer"], false);
        assert_eq!(dates["regularPrice"], 450.0);
        assert_eq!(dates["subscription_dates"], "");
        assert_eq!(dates["image"], "rose.jpg");
        assert_eq!(payload["price"], 450.0);
        assert_eq!(payload["name"], "Rooh Gulab");
    }

    #[test]
    fn test_product_status() {
        let product: Product =
            serde_json::from_value(json!({"_id": 7, "status": false})).unwrap();
        assert_eq!(product.id.as_str(), "7");
        assert!(!product.is_active());
        assert_eq!(product.primary_image(), "");
    }
}
