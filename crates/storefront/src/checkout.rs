//! Order payload assembly.
//!
//! Turns the cart mirror and the checkout form into the document accepted
//! by `POST /order/create-new-order`. Payment is always cash on delivery
//! and delivery is always the standard schedule.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use velorm_core::{OrderStatus, PaymentOption, ProductId, UserId};

use crate::models::CartItem;
use crate::pricing::{self, PricingError};

/// Contact number sent when the form leaves it blank.
pub const FALLBACK_CONTACT: &str = "9999999999";

const ORDER_PLACE: &str = "Website";
const STANDARD_DELIVERY: &str = "Standard";
const ORDER_TYPE: &str = "web";

/// Reasons a checkout is refused before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("Your cart is empty")]
    EmptyCart,

    /// A required form field is blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The order amount could not be computed.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Shipping and contact details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub landmark: String,
}

impl CheckoutForm {
    fn validate(&self) -> Result<(), CheckoutError> {
        for (field, value) in [
            ("first name", &self.first_name),
            ("address", &self.address),
            ("city", &self.city),
        ] {
            if value.trim().is_empty() {
                return Err(CheckoutError::MissingField(field));
            }
        }
        Ok(())
    }
}

/// The order document sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub order_place: String,
    pub product: Vec<OrderLine>,
    pub user: OrderUser,
    #[serde(rename = "shippingaddress")]
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub delivery_schedule: String,
    pub delivery_date: String,
    pub payment_option: PaymentOption,
    pub wallet_deducted_amount: u32,
    pub delivery_type: String,
    #[serde(rename = "type")]
    pub order_type: String,
}

/// A product line: product id and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    pub id: ProductId,
    #[serde(rename = "selQty")]
    pub quantity: u32,
}

/// Customer details attached to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub location: String,
    pub street: String,
    pub address: String,
    pub landmark: String,
    pub location_obj: GeoPoint,
}

/// GeoJSON point. Coordinates are not collected, so always `[0, 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [i32; 2],
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [0, 0],
        }
    }
}

impl OrderPayload {
    /// Assemble an order from the cart and checkout form.
    ///
    /// `amount` is the cart subtotal plus `shipping`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the cart is empty or the form lacks a
    /// first name, address or city.
    pub fn build(
        items: &[CartItem],
        form: &CheckoutForm,
        user_id: &UserId,
        shipping: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        form.validate()?;

        let contact = if form.contact.trim().is_empty() {
            FALLBACK_CONTACT.to_string()
        } else {
            form.contact.trim().to_string()
        };
        let landmark = if form.landmark.trim().is_empty() {
            form.city.trim().to_string()
        } else {
            form.landmark.trim().to_string()
        };

        Ok(Self {
            order_place: ORDER_PLACE.to_string(),
            product: items
                .iter()
                .map(|item| OrderLine {
                    id: item.product_id().clone(),
                    quantity: item.quantity,
                })
                .collect(),
            user: OrderUser {
                id: user_id.clone(),
                name: format!("{} {}", form.first_name.trim(), form.last_name.trim()),
                email: form.email.trim().to_string(),
                contact,
            },
            shipping_address: ShippingAddress {
                location: form.city.trim().to_string(),
                street: form.address.trim().to_string(),
                address: format!(
                    "{}, {}, {}",
                    form.address.trim(),
                    form.city.trim(),
                    form.postal_code.trim()
                ),
                landmark,
                location_obj: GeoPoint::default(),
            },
            status: OrderStatus::Ordered,
            amount: pricing::total(items, shipping)?,
            delivery_schedule: STANDARD_DELIVERY.to_string(),
            delivery_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            payment_option: PaymentOption::Cod,
            wallet_deducted_amount: 0,
            delivery_type: STANDARD_DELIVERY.to_string(),
            order_type: ORDER_TYPE.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::normalize_entry;
    use chrono::TimeZone;
    use serde_json::json;

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            email: "asha@velorm.com".to_string(),
            contact: String::new(),
            address: "1 MG Road".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            landmark: String::new(),
        }
    }

    fn cart() -> Vec<CartItem> {
        vec![
            normalize_entry(&json!({"_id": "p-1", "price": 500, "selQty": 2})).unwrap(),
            normalize_entry(&json!({
                "_id": "c-2",
                "cartProduct": {"_id": "p-2", "regularPrice": 250},
                "selQty": 1,
            }))
            .unwrap(),
        ]
    }

    #[test]
    fn test_payload_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let payload = OrderPayload::build(
            &cart(),
            &form(),
            &UserId::new("u-1"),
            Decimal::new(500, 2),
            now,
        )
        .unwrap();

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "orderPlace": "Website",
                "product": [{"id": "p-1", "selQty": 2}, {"id": "p-2", "selQty": 1}],
                "user": {
                    "_id": "u-1",
                    "name": "Asha Rao",
                    "email": "asha@velorm.com",
                    "contact": "9999999999",
                },
                "shippingaddress": {
                    "location": "Pune",
                    "street": "1 MG Road",
                    "address": "1 MG Road, Pune, 411001",
                    "landmark": "Pune",
                    "locationObj": {"type": "Point", "coordinates": [0, 0]},
                },
                "status": "ORDERED",
                "amount": 1255.0,
                "deliverySchedule": "Standard",
                "deliveryDate": "2026-03-04T05:06:07.000Z",
                "paymentOption": "COD",
                "walletDeductedAmount": 0,
                "deliveryType": "Standard",
                "type": "web",
            })
        );
    }

    #[test]
    fn test_explicit_contact_and_landmark_kept() {
        let mut form = form();
        form.contact = "9876543210".to_string();
        form.landmark = "Near the station".to_string();

        let payload =
            OrderPayload::build(&cart(), &form, &UserId::new("u-1"), Decimal::ZERO, Utc::now())
                .unwrap();
        assert_eq!(payload.user.contact, "9876543210");
        assert_eq!(payload.shipping_address.landmark, "Near the station");
        assert_eq!(payload.amount, Decimal::new(1250, 0));
    }

    #[test]
    fn test_rejects_empty_cart() {
        let err = OrderPayload::build(&[], &form(), &UserId::new("u-1"), Decimal::ZERO, Utc::now())
            .unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
    }

    #[test]
    fn test_rejects_missing_fields() {
        for field in ["first name", "address", "city"] {
            let mut form = form();
            match field {
                "first name" => form.first_name.clear(),
                "address" => form.address = "  ".to_string(),
                _ => form.city.clear(),
            }
            let err =
                OrderPayload::build(&cart(), &form, &UserId::new("u-1"), Decimal::ZERO, Utc::now())
                    .unwrap_err();
            assert_eq!(err, CheckoutError::MissingField(field));
        }
    }

    #[test]
    fn test_rejects_overflowing_amount() {
        let items = vec![
            normalize_entry(&json!({
                "_id": "p-1",
                "price": "10000000000000000000000",
                "selQty": 4_000_000_000_u32,
            }))
            .unwrap(),
        ];
        let err =
            OrderPayload::build(&items, &form(), &UserId::new("u-1"), Decimal::ZERO, Utc::now())
                .unwrap_err();
        assert_eq!(err, CheckoutError::Pricing(PricingError::Overflow));
    }
}
