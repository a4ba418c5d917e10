//! Cart domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use velorm_core::{CartEntryId, ProductId};

use crate::api::lenient;

/// Product snapshot embedded in a cart entry.
///
/// Missing or malformed prices read as zero and a missing image as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartProduct {
    #[serde(rename = "_id", deserialize_with = "lenient::id")]
    pub id: ProductId,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
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
    #[serde(
        default,
        deserialize_with = "lenient::string_or_empty",
        skip_serializing_if = "String::is_empty"
    )]
    pub image: String,
    /// Everything else in the snapshot, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl CartProduct {
    /// Image to show for this product.
    ///
    /// Prefers the snapshot's `image`, then the first `productImage`, then
    /// the image recorded under `productwithdates`.
    #[must_use]
    pub fn display_image(&self) -> Option<String> {
        if !self.image.is_empty() {
            return Some(self.image.clone());
        }
        if let Some(JsonValue::Array(images)) = self.extra.get("productImage")
            && let Some(image) = images.iter().find_map(lenient::image_from_value)
        {
            return Some(image);
        }
        self.extra
            .get("productwithdates")
            .and_then(|dates| dates.get("image"))
            .and_then(lenient::image_from_value)
    }
}

/// One line of the local cart mirror.
///
/// Serialized in the wrapped server shape (`_id`, `cartProduct`, `selQty`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Cart-entry id as reported by the server.
    #[serde(rename = "_id")]
    pub id: CartEntryId,
    #[serde(rename = "cartProduct")]
    pub product: CartProduct,
    /// Selected quantity, always at least 1.
    #[serde(rename = "selQty")]
    pub quantity: u32,
}

impl CartItem {
    /// Product id this entry is keyed by.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cart_product_defaults() {
        let product: CartProduct = serde_json::from_value(json!({
            "_id": "p-1",
            "price": null,
            "regularPrice": "not a price",
        }))
        .unwrap();

        assert_eq!(product.name, "");
        assert_eq!(product.price, Decimal::ZERO);
        assert_eq!(product.regular_price, Decimal::ZERO);
        assert_eq!(product.display_image(), None);
    }

    #[test]
    fn test_display_image_fallbacks() {
        let product: CartProduct = serde_json::from_value(json!({
            "_id": "p-1",
            "productImage": [{"filename": "rose.jpg"}],
        }))
        .unwrap();
        assert_eq!(product.display_image().as_deref(), Some("rose.jpg"));

        let product: CartProduct = serde_json::from_value(json!({
            "_id": "p-2",
            "productwithdates": {"image": "musk.jpg"},
        }))
        .unwrap();
        assert_eq!(product.display_image().as_deref(), Some("musk.jpg"));
    }

    #[test]
    fn test_cart_item_serializes_wrapped_shape() {
        let item = CartItem {
            id: CartEntryId::new("c-1"),
            product: serde_json::from_value(json!({"_id": "p-1", "price": 500})).unwrap(),
            quantity: 2,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["_id"], "c-1");
        assert_eq!(value["cartProduct"]["_id"], "p-1");
        assert_eq!(value["cartProduct"]["price"], 500.0);
        assert_eq!(value["selQty"], 2);
    }
}
