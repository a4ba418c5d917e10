//! Terminal output for command results.

#![allow(clippy::print_stdout)]

use chrono::DateTime;
use serde_json::Value as JsonValue;

use velorm_core::{CurrencyCode, Price};
use velorm_storefront::api::{Category, Product, category_name};
use velorm_storefront::models::{CartItem, OrderRecord, User};
use velorm_storefront::pricing::{self, CartTotals};

pub fn line(message: &str) {
    println!("{message}");
}

pub fn user(user: &User, currency: CurrencyCode) {
    println!("{}", user.display_name());
    println!("  id:      {}", user.id);
    if let Some(email) = user.email.as_deref().filter(|e| !e.is_empty()) {
        println!("  email:   {email}");
    }
    if let Some(contact) = &user.contact {
        println!("  contact: {contact}");
    }
    if let Some(balance) = user.wallet_balance {
        println!("  wallet:  {}", Price::new(balance, currency).display());
    }
}

pub fn products(products: &[&Product], categories: &[Category], currency: CurrencyCode) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        println!(
            "{:<32} {:>12}  {:<16} {}",
            product.name,
            Price::new(product.list_price(), currency).display(),
            category_name(product.category_id.as_ref(), categories),
            product.slug,
        );
    }
}

pub fn product_detail(product: &Product, categories: &[Category], currency: CurrencyCode) {
    println!("{}", product.name);
    println!("  id:       {}", product.id);
    println!(
        "  category: {}",
        category_name(product.category_id.as_ref(), categories)
    );
    println!(
        "  price:    {}",
        Price::new(product.list_price(), currency).display()
    );
    if !product.primary_image().is_empty() {
        println!("  image:    {}", product.primary_image());
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        println!("{:<24} {}", category.category_name, category.slug);
    }
}

pub fn cart(items: &[CartItem], totals: &CartTotals, currency: CurrencyCode) {
    if items.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in items {
        println!(
            "{:<28} {:>3} x {:>10} = {:>10}   {}",
            item.product.name,
            item.quantity,
            Price::new(pricing::unit_price(&item.product), currency).display(),
            pricing::line_total(item)
                .map_or_else(|e| e.to_string(), |t| Price::new(t, currency).display()),
            item.product_id(),
        );
    }
    println!();
    println!("Subtotal: {}", totals.subtotal.display());
    println!("Shipping: {}", totals.shipping.display());
    println!("Total:    {}", totals.total.display());
}

pub fn order_placed(confirmation: &JsonValue, totals: &CartTotals) {
    let id = confirmation
        .get("response")
        .and_then(|r| r.get("_id"))
        .or_else(|| confirmation.get("_id"))
        .and_then(JsonValue::as_str);
    match id {
        Some(id) => println!("Order {id} placed"),
        None => println!("Order placed"),
    }
    println!("Total due on delivery: {}", totals.total.display());
}

pub fn orders(orders: &[OrderRecord], currency: CurrencyCode) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        let date = order
            .created_at
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let amount = order
            .amount
            .map_or_else(|| "-".to_string(), |a| Price::new(a, currency).display());
        println!(
            "{:<26} {:<10} {:<10} {:>12}",
            order.id.as_ref().map_or("-", |id| id.as_str()),
            date,
            order.status.as_str(),
            amount,
        );
        for line in &order.product {
            println!("    {} x {}", line.quantity(), line.name());
        }
        if let Some(address) = order.address_line() {
            println!("    ship to: {address}");
        }
    }
}
