//! User domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use velorm_core::UserId;

use crate::api::lenient;

/// An authenticated shopper as returned by the login endpoints.
///
/// Created by OTP verification and replaced wholesale by profile updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend document id. Also used as the session token.
    #[serde(rename = "_id", deserialize_with = "lenient::id")]
    pub id: UserId,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    /// Contact number; the backend stores it as a number.
    #[serde(
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact: Option<String>,
    #[serde(
        rename = "walletBalance",
        default,
        deserialize_with = "lenient::optional_amount",
        serialize_with = "rust_decimal::serde::float_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub wallet_balance: Option<Decimal>,
    /// Fields not modelled above, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl User {
    /// Name to greet the user with, falling back to the contact number.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.contact.as_deref())
            .unwrap_or_else(|| self.id.as_str())
    }
}
