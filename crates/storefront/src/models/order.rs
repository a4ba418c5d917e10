//! Order history records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use velorm_core::{OrderId, OrderStatus, UserId};

use crate::api::lenient;

/// An order as listed by `GET /order/get-all-orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "_id", default, deserialize_with = "lenient::optional_id")]
    pub id: Option<OrderId>,
    /// Either a populated user document or a bare user id.
    #[serde(default)]
    pub user: Option<JsonValue>,
    /// Status, upper-cased and defaulted to `ORDERED`.
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(
        default,
        deserialize_with = "lenient::optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub product: Vec<OrderLineRecord>,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "lenient::optional_string"
    )]
    pub created_at: Option<String>,
    #[serde(rename = "shippingaddress", default)]
    pub shipping_address: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl OrderRecord {
    /// Whether this order was placed by `user_id`.
    #[must_use]
    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        let owner = match &self.user {
            Some(JsonValue::Object(user)) => user.get("_id").and_then(lenient::id_from_value),
            Some(other) => lenient::id_from_value(other),
            None => None,
        };
        owner.is_some_and(|id| id == user_id.as_str())
    }

    /// Formatted shipping address line, if the server recorded one.
    #[must_use]
    pub fn address_line(&self) -> Option<&str> {
        self.shipping_address
            .as_ref()
            .and_then(|a| a.get("address"))
            .and_then(JsonValue::as_str)
    }
}

/// A product line inside an order.
///
/// `id` is either a bare product id or a populated product document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    #[serde(default)]
    pub id: JsonValue,
    #[serde(rename = "selQty", default)]
    pub quantity: JsonValue,
}

impl OrderLineRecord {
    /// Product name when the line carries a populated product.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or("Product")
    }

    /// Quantity, defaulting to 1.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        lenient::quantity_from_value(&self.quantity).unwrap_or(1)
    }

    /// Line total (`price × quantity`) when a price is present.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        let price = self.id.get("price").and_then(lenient::decimal_from_value)?;
        Some(price * Decimal::from(self.quantity()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_record_lenient_fields() {
        let order: OrderRecord = serde_json::from_value(json!({
            "_id": "o-1",
            "user": {"_id": "u-1", "name": "Asha"},
            "status": "shipped",
            "amount": 1205,
            "product": [{"id": {"name": "Rooh Gulab", "price": 600}, "selQty": 2}],
            "shippingaddress": {"address": "1 MG Road, Pune, 411001"},
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.amount, Some(Decimal::new(1205, 0)));
        assert!(order.belongs_to(&UserId::new("u-1")));
        assert!(!order.belongs_to(&UserId::new("u-2")));
        assert_eq!(order.address_line(), Some("1 MG Road, Pune, 411001"));

        let line = order.product.first().unwrap();
        assert_eq!(line.name(), "Rooh Gulab");
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.line_total(), Some(Decimal::new(1200, 0)));
    }

    #[test]
    fn test_order_record_missing_status_is_ordered() {
        let order: OrderRecord = serde_json::from_value(json!({"_id": "o-2"})).unwrap();
        assert_eq!(order.status, OrderStatus::Ordered);
        assert!(!order.belongs_to(&UserId::new("u-1")));
    }

    #[test]
    fn test_order_record_with_bare_user_id() {
        let order: OrderRecord =
            serde_json::from_value(json!({"user": "u-9", "product": null})).unwrap();
        assert!(order.belongs_to(&UserId::new("u-9")));
        assert!(order.product.is_empty());
    }

    #[test]
    fn test_order_line_with_bare_id() {
        let line: OrderLineRecord =
            serde_json::from_value(json!({"id": "p-1", "selQty": 0})).unwrap();
        assert_eq!(line.name(), "Product");
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.line_total(), None);
    }
}
