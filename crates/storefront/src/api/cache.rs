//! Cache types for catalog responses.

use std::sync::Arc;

use super::types::{Category, Product};

/// Cache key for products and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Categories,
    Product(String),
}

impl CacheKey {
    /// String form used as the `moka` key.
    pub fn as_key(&self) -> String {
        match self {
            Self::Products => "products".to_string(),
            Self::Categories => "categories".to_string(),
            Self::Product(slug) => format!("product:{slug}"),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<Vec<Product>>),
    Categories(Arc<Vec<Category>>),
    Product(Box<Product>),
}
