//! Integration tests for catalog reads and caching.
//!
//! Run with: cargo test -p velorm-integration-tests

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use velorm_integration_tests::MockApi;
use velorm_storefront::api::{ApiError, FALLBACK_CATEGORY_NAME, category_name};

fn hits(mock: &MockApi, path: &str) -> usize {
    mock.with_state(|s| s.hits.get(path).copied().unwrap_or(0))
}

#[tokio::test]
async fn test_products_are_parsed_leniently() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;

    let products = client.get_products().await.unwrap();
    assert_eq!(products.len(), 3);

    let rose = products.first().unwrap();
    assert_eq!(rose.list_price(), Decimal::new(500, 0));
    assert_eq!(rose.primary_image(), "rose.jpg");
    assert!(rose.is_active());

    let oud = products.get(1).unwrap();
    assert_eq!(oud.price, Decimal::new(1200, 0));
    assert_eq!(oud.list_price(), Decimal::new(1200, 0));
    assert_eq!(oud.primary_image(), "oud.jpg");

    assert!(!products.get(2).unwrap().is_active());
}

#[tokio::test]
async fn test_category_names_fall_back() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;

    let products = client.get_products().await.unwrap();
    let categories = client.get_categories().await.unwrap();

    let names: Vec<&str> = products
        .iter()
        .map(|p| category_name(p.category_id.as_ref(), &categories))
        .collect();
    assert_eq!(
        names,
        vec!["Attars", FALLBACK_CATEGORY_NAME, FALLBACK_CATEGORY_NAME]
    );
}

#[tokio::test]
async fn test_catalog_is_cached_until_invalidated() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;

    client.get_products().await.unwrap();
    client.get_products().await.unwrap();
    assert_eq!(hits(&mock, "products"), 1);

    client.get_product_by_slug("rooh-gulab").await.unwrap();
    client.get_product_by_slug("rooh-gulab").await.unwrap();
    assert_eq!(hits(&mock, "product"), 1);

    client.invalidate_product("rooh-gulab").await;
    client.get_product_by_slug("rooh-gulab").await.unwrap();
    assert_eq!(hits(&mock, "product"), 2);

    client.invalidate_catalog();
    client.get_products().await.unwrap();
    assert_eq!(hits(&mock, "products"), 2);
}

#[tokio::test]
async fn test_unknown_slug_is_not_found() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;

    let err = client.get_product_by_slug("no-such-thing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_rate_limit_reports_retry_after() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;
    mock.with_state(|s| s.rate_limit_catalog = true);

    let err = client.get_categories().await.unwrap_err();
    assert!(matches!(err, ApiError::RateLimited(7)));
}

#[tokio::test]
async fn test_add_to_cart_payload_from_catalog() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.storefront().unwrap().client;
    let product = client.get_product_by_slug("rooh-gulab").await.unwrap();

    let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
    let payload = product.add_to_cart_payload(now);
    assert_eq!(
        payload,
        json!({
            "productwithdates": {
                "subscribed_type": "One Time",
                "start_date": "2026-03-04T05:06:07.000Z",
                "membership_offer": false,
                "regularPrice": 500.0,
                "subscription_dates": "",
                "name": "Rooh Gulab",
                "image": "rose.jpg",
            },
            "price": 450.0,
            "name": "Rooh Gulab",
        })
    );
}
