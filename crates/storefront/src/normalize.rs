//! Cart entry normalization.
//!
//! The cart endpoints answer in two shapes, sometimes mixed in one list:
//!
//! 1. **Wrapped** - a cart document whose `cartProduct` is an object:
//!    `{ "_id": <entry id>, "cartProduct": { "_id": <product id>, ... }, "selQty": n }`.
//!    Quantity comes from the top-level `selQty`, else `cartProduct.selQty`.
//!    A missing entry id falls back to the product id.
//! 2. **Bare** - the product itself: `{ "_id": <product id>, "selQty": n, ... }`.
//!    The product id doubles as the entry id.
//!
//! Quantities that are missing, zero, negative or non-numeric read as 1.
//! Any other shape (non-objects, objects without a usable `_id`, a
//! `cartProduct` that is not an object) is a [`NormalizeError`].

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::debug;

use velorm_core::CartEntryId;

use crate::api::lenient;
use crate::models::{CartItem, CartProduct};

/// A cart entry did not match either known shape.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The entry is not a JSON object.
    #[error("cart entry is not an object (got {0})")]
    NotAnObject(&'static str),

    /// The object matches neither the wrapped nor the bare shape.
    #[error("unrecognized cart entry shape: {0}")]
    UnrecognizedShape(String),

    /// The embedded product could not be read.
    #[error("invalid cart product: {0}")]
    InvalidProduct(#[from] serde_json::Error),

    /// The cart response is neither a list nor null.
    #[error("cart response is not a list (got {0})")]
    NotAList(&'static str),
}

/// Normalize one cart entry.
///
/// # Errors
///
/// Returns `NormalizeError` if `entry` matches neither shape.
pub fn normalize_entry(entry: &JsonValue) -> Result<CartItem, NormalizeError> {
    let JsonValue::Object(object) = entry else {
        return Err(NormalizeError::NotAnObject(json_kind(entry)));
    };

    match object.get("cartProduct") {
        Some(JsonValue::Object(product)) => normalize_wrapped(object, product),
        Some(JsonValue::Null) | None => normalize_bare(object),
        Some(other) => Err(NormalizeError::UnrecognizedShape(format!(
            "cartProduct is {}",
            json_kind(other)
        ))),
    }
}

/// Normalize a cart list response.
///
/// `None` and `null` are an empty cart. Entries sharing a product id collapse
/// to the last one.
///
/// # Errors
///
/// Returns `NormalizeError` if the response is not a list or any entry
/// matches neither shape.
pub fn normalize_entries(response: Option<&JsonValue>) -> Result<Vec<CartItem>, NormalizeError> {
    let entries = match response {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(JsonValue::Array(entries)) => entries,
        Some(other) => return Err(NormalizeError::NotAList(json_kind(other))),
    };

    let mut items: Vec<CartItem> = Vec::with_capacity(entries.len());
    for entry in entries {
        upsert(&mut items, normalize_entry(entry)?);
    }
    debug!(count = items.len(), "Normalized cart entries");
    Ok(items)
}

/// Normalize a single-entry mutation response; `None`/`null` yields `None`.
///
/// # Errors
///
/// Returns `NormalizeError` if the entry matches neither shape.
pub fn normalize_mutation(response: Option<&JsonValue>) -> Result<Option<CartItem>, NormalizeError> {
    match response {
        None | Some(JsonValue::Null) => Ok(None),
        Some(entry) => normalize_entry(entry).map(Some),
    }
}

/// Replace the entry with the same product id, or append.
pub fn upsert(items: &mut Vec<CartItem>, item: CartItem) {
    if let Some(existing) = items
        .iter_mut()
        .find(|existing| existing.product_id() == item.product_id())
    {
        *existing = item;
    } else {
        items.push(item);
    }
}

fn normalize_wrapped(
    object: &Map<String, JsonValue>,
    product: &Map<String, JsonValue>,
) -> Result<CartItem, NormalizeError> {
    let product = read_product(product)?;
    let quantity = object
        .get("selQty")
        .and_then(lenient::quantity_from_value)
        .or_else(|| product.extra.get("selQty").and_then(lenient::quantity_from_value))
        .unwrap_or(1);
    let id = object
        .get("_id")
        .and_then(lenient::id_from_value)
        .filter(|id| !id.trim().is_empty())
        .map_or_else(|| CartEntryId::new(product.id.as_str()), CartEntryId::new);

    Ok(CartItem {
        id,
        product,
        quantity,
    })
}

fn normalize_bare(object: &Map<String, JsonValue>) -> Result<CartItem, NormalizeError> {
    if object
        .get("_id")
        .and_then(lenient::id_from_value)
        .is_none_or(|id| id.trim().is_empty())
    {
        return Err(NormalizeError::UnrecognizedShape(
            "object has neither cartProduct nor _id".to_string(),
        ));
    }

    let product = read_product(object)?;
    let quantity = object
        .get("selQty")
        .and_then(lenient::quantity_from_value)
        .unwrap_or(1);

    Ok(CartItem {
        id: CartEntryId::new(product.id.as_str()),
        product,
        quantity,
    })
}

fn read_product(object: &Map<String, JsonValue>) -> Result<CartProduct, NormalizeError> {
    let product: CartProduct = serde_json::from_value(JsonValue::Object(object.clone()))?;
    if product.id.is_empty() {
        return Err(NormalizeError::UnrecognizedShape(
            "cart product has an empty _id".to_string(),
        ));
    }
    Ok(product)
}

const fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_wrapped_entry_kept() {
        let item = normalize_entry(&json!({
            "_id": "c-1",
            "cartProduct": {"_id": "p-1", "name": "Rooh Gulab", "price": 500},
            "selQty": 2,
        }))
        .unwrap();

        assert_eq!(item.id.as_str(), "c-1");
        assert_eq!(item.product_id().as_str(), "p-1");
        assert_eq!(item.product.name, "Rooh Gulab");
        assert_eq!(item.product.price, Decimal::new(500, 0));
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_wrapped_entry_uses_nested_quantity() {
        let item = normalize_entry(&json!({
            "_id": "c-1",
            "cartProduct": {"_id": "p-1", "selQty": 3},
        }))
        .unwrap();
        assert_eq!(item.quantity, 3);

        let item = normalize_entry(&json!({
            "cartProduct": {"_id": "p-1"},
            "selQty": 0,
        }))
        .unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.id.as_str(), "p-1");
    }

    #[test]
    fn test_bare_product_wrapped() {
        let item = normalize_entry(&json!({
            "_id": "p-2",
            "name": "Velvet Petals",
            "regularPrice": "650",
            "selQty": "4",
        }))
        .unwrap();

        assert_eq!(item.id.as_str(), "p-2");
        assert_eq!(item.product_id().as_str(), "p-2");
        assert_eq!(item.product.regular_price, Decimal::new(650, 0));
        assert_eq!(item.quantity, 4);
    }

    #[test]
    fn test_bare_product_defaults() {
        let item = normalize_entry(&json!({"_id": 17, "selQty": -2})).unwrap();
        assert_eq!(item.product_id().as_str(), "17");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.product.price, Decimal::ZERO);
        assert_eq!(item.product.image, "");
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(matches!(
            normalize_entry(&json!("p-1")),
            Err(NormalizeError::NotAnObject("a string"))
        ));
        assert!(matches!(
            normalize_entry(&json!({"name": "no id"})),
            Err(NormalizeError::UnrecognizedShape(_))
        ));
        assert!(matches!(
            normalize_entry(&json!({"_id": "c-1", "cartProduct": "p-1"})),
            Err(NormalizeError::UnrecognizedShape(_))
        ));
        assert!(matches!(
            normalize_entry(&json!({"_id": "c-1", "cartProduct": {"name": "no id"}})),
            Err(NormalizeError::InvalidProduct(_))
        ));
    }

    #[test]
    fn test_entries_null_and_empty() {
        assert!(normalize_entries(None).unwrap().is_empty());
        assert!(normalize_entries(Some(&json!(null))).unwrap().is_empty());
        assert!(normalize_entries(Some(&json!([]))).unwrap().is_empty());
        assert!(matches!(
            normalize_entries(Some(&json!({"_id": "p-1"}))),
            Err(NormalizeError::NotAList(_))
        ));
    }

    #[test]
    fn test_entries_mixed_shapes_deduplicated() {
        let items = normalize_entries(Some(&json!([
            {"_id": "c-1", "cartProduct": {"_id": "p-1"}, "selQty": 1},
            {"_id": "p-2", "selQty": 2},
            {"_id": "c-3", "cartProduct": {"_id": "p-1"}, "selQty": 5},
        ])))
        .unwrap();

        assert_eq!(items.len(), 2);
        let first = items.first().unwrap();
        assert_eq!(first.product_id().as_str(), "p-1");
        assert_eq!(first.quantity, 5);
    }

    #[test]
    fn test_mutation_null_is_noop() {
        assert!(normalize_mutation(None).unwrap().is_none());
        assert!(normalize_mutation(Some(&json!(null))).unwrap().is_none());
        assert!(normalize_mutation(Some(&json!({"_id": "p-1"}))).unwrap().is_some());
    }

    #[test]
    fn test_upsert_replaces_or_appends() {
        let mut items = Vec::new();
        upsert(&mut items, normalize_entry(&json!({"_id": "p-1", "selQty": 1})).unwrap());
        upsert(&mut items, normalize_entry(&json!({"_id": "p-2", "selQty": 1})).unwrap());
        upsert(&mut items, normalize_entry(&json!({"_id": "p-1", "selQty": 3})).unwrap());

        assert_eq!(items.len(), 2);
        assert_eq!(items.first().unwrap().quantity, 3);
    }
}
