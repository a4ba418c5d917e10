//! Lenient deserializers for loosely typed backend JSON.
//!
//! The backend is not consistent about types: ids arrive as numbers or
//! strings, prices as numbers, numeric strings or `null`, quantities as
//! floats. These helpers absorb that variance and fall back to defaults
//! rather than failing the whole payload.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Interpret a JSON value as a decimal amount.
///
/// Accepts numbers and numeric strings. Returns `None` for anything else.
#[must_use]
pub fn decimal_from_value(value: &JsonValue) -> Option<Decimal> {
    match value {
        JsonValue::Number(n) => parse_decimal(&n.to_string()),
        JsonValue::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Interpret a JSON value as a positive quantity.
///
/// Zero, negative, fractional-below-one and non-numeric values yield `None`.
/// Fractional quantities are truncated.
#[must_use]
pub fn quantity_from_value(value: &JsonValue) -> Option<u32> {
    let amount = decimal_from_value(value)?.trunc();
    if amount < Decimal::ONE {
        return None;
    }
    amount.to_u32()
}

/// Interpret a JSON value as an identifier string.
#[must_use]
pub fn id_from_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Deserialize ID that can be number or string
pub fn id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    use serde::de::Error;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    id_from_value(&value)
        .map(T::from)
        .ok_or_else(|| D::Error::custom("expected number or string for id"))
}

/// Deserialize optional ID that can be number, string or null
pub fn optional_id<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(id_from_value).map(T::from))
}

/// Deserialize amount that can be number, string or garbage (garbage is zero)
pub fn amount_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(decimal_from_value)
        .unwrap_or_default())
}

/// Deserialize an optional amount; unparseable values become `None`.
pub fn optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(decimal_from_value))
}

/// Deserialize a string that may arrive as a number or null.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserialize a string field, treating null or non-strings as empty.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    optional_string(deserializer).map(Option::unwrap_or_default)
}

/// Deserialize a list that may be missing or `null`.
pub fn vec_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a list of image references.
///
/// Entries may be plain strings or objects carrying a `filename`; anything
/// else is skipped.
pub fn images<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    let Some(JsonValue::Array(entries)) = value else {
        return Ok(Vec::new());
    };
    Ok(entries.iter().filter_map(image_from_value).collect())
}

/// Extract an image reference from a string or `{ filename }` object.
#[must_use]
pub fn image_from_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Object(map) => map
            .get("filename")
            .and_then(JsonValue::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        _ => None,
    }
}

/// Deserialize the `baseResponse.status` flag (number, bool or string).
pub fn status_flag<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_i64(),
        Some(JsonValue::Bool(b)) => Some(i64::from(b)),
        Some(JsonValue::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decimal_from_value() {
        assert_eq!(decimal_from_value(&json!(500)), Some(Decimal::new(500, 0)));
        assert_eq!(decimal_from_value(&json!(19.99)), Some(Decimal::new(1999, 2)));
        assert_eq!(decimal_from_value(&json!("12.50")), Some(Decimal::new(1250, 2)));
        assert_eq!(decimal_from_value(&json!("abc")), None);
        assert_eq!(decimal_from_value(&json!(null)), None);
    }

    #[test]
    fn test_quantity_from_value() {
        assert_eq!(quantity_from_value(&json!(3)), Some(3));
        assert_eq!(quantity_from_value(&json!("2")), Some(2));
        assert_eq!(quantity_from_value(&json!(2.7)), Some(2));
        assert_eq!(quantity_from_value(&json!(0)), None);
        assert_eq!(quantity_from_value(&json!(-4)), None);
        assert_eq!(quantity_from_value(&json!(0.5)), None);
        assert_eq!(quantity_from_value(&json!("many")), None);
        assert_eq!(quantity_from_value(&json!(true)), None);
    }

    #[test]
    fn test_image_from_value() {
        assert_eq!(image_from_value(&json!("a.png")), Some("a.png".to_string()));
        assert_eq!(
            image_from_value(&json!({"filename": "b.png"})),
            Some("b.png".to_string())
        );
        assert_eq!(image_from_value(&json!("")), None);
        assert_eq!(image_from_value(&json!(42)), None);
    }
}
