//! Cart price arithmetic.

use rust_decimal::Decimal;
use thiserror::Error;

use velorm_core::{CurrencyCode, Price};

use crate::models::{CartItem, CartProduct};

/// Arithmetic failure while pricing a cart.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PricingError {
    /// A line or running total does not fit in a `Decimal`.
    #[error("Cart total is too large")]
    Overflow,
}

/// Unit price charged for a cart product.
///
/// `regularPrice` when non-zero, else `price`, else zero.
#[must_use]
pub fn unit_price(product: &CartProduct) -> Decimal {
    if product.regular_price.is_zero() {
        product.price
    } else {
        product.regular_price
    }
}

/// Price of one cart line (`unit price × quantity`).
///
/// # Errors
///
/// Returns `PricingError::Overflow` when the product does not fit.
pub fn line_total(item: &CartItem) -> Result<Decimal, PricingError> {
    unit_price(&item.product)
        .checked_mul(Decimal::from(item.quantity))
        .ok_or(PricingError::Overflow)
}

/// Sum of all line totals.
///
/// # Errors
///
/// Returns `PricingError::Overflow` when any line or the sum does not fit.
pub fn subtotal(items: &[CartItem]) -> Result<Decimal, PricingError> {
    items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(line_total(item)?)
            .ok_or(PricingError::Overflow)
    })
}

/// Subtotal plus a flat `shipping` fee.
///
/// # Errors
///
/// Returns `PricingError::Overflow` when the total does not fit.
pub fn total(items: &[CartItem], shipping: Decimal) -> Result<Decimal, PricingError> {
    subtotal(items)?
        .checked_add(shipping)
        .ok_or(PricingError::Overflow)
}

/// Subtotal, shipping and total for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CartTotals {
    /// Compute totals for `items` with a flat `shipping` fee.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::Overflow` when server prices or quantities
    /// push a total past what `Decimal` can hold.
    pub fn compute(
        items: &[CartItem],
        shipping: Decimal,
        currency: CurrencyCode,
    ) -> Result<Self, PricingError> {
        let subtotal = subtotal(items)?;
        let total = subtotal
            .checked_add(shipping)
            .ok_or(PricingError::Overflow)?;
        Ok(Self {
            subtotal: Price::new(subtotal, currency),
            shipping: Price::new(shipping, currency),
            total: Price::new(total, currency),
        })
    }
}
