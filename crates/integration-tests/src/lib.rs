//! Integration test support for Velorm.
//!
//! Provides [`MockApi`], an in-process `axum` server that imitates the Velorm
//! REST API closely enough to drive the storefront stores end to end.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p velorm-integration-tests
//! ```
//!
//! The mock mirrors the real API's quirks:
//! - every JSON body is wrapped in `{ baseResponse: { status, message }, response }`
//! - cart responses come back either as cart documents or as bare products,
//!   selected with [`CartShape`]
//! - an empty cart is `response: null`
//! - deletion is a `GET` whose body carries nothing useful

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use velorm_storefront::Storefront;
use velorm_storefront::config::StorefrontConfig;
use velorm_storefront::error::StoreError;
use velorm_storefront::storage::{MemoryStorage, Storage};

/// OTP the mock accepts for every contact.
pub const VALID_OTP: &str = "123456";

/// Contact number the mock refuses to send an OTP to.
pub const BLOCKED_CONTACT: &str = "9000000000";

/// How cart entries are rendered in responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CartShape {
    /// `{ _id, cartProduct: {...}, selQty }`
    #[default]
    Wrapped,
    /// The product document itself with `selQty` merged in.
    Bare,
    /// Alternate between the two, starting with wrapped.
    Mixed,
}

/// Mutable state behind the mock.
#[derive(Debug, Default)]
pub struct MockState {
    pub products: Vec<Value>,
    pub categories: Vec<Value>,
    /// Users by contact number.
    pub users: HashMap<String, Value>,
    /// Cart lines by user id: product id and quantity, in insertion order.
    pub carts: HashMap<String, Vec<(String, u32)>>,
    pub orders: Vec<Value>,
    pub cart_shape: CartShape,
    /// Answer every cart fetch with this body instead of the real cart.
    pub cart_override: Option<Value>,
    /// Cart fetches read the cart, then wait this long before answering.
    pub cart_fetch_delay: Option<Duration>,
    /// Answer order submissions with HTTP 500.
    pub fail_orders: bool,
    /// Answer catalog requests with HTTP 429.
    pub rate_limit_catalog: bool,
    /// Number of catalog requests served, by path.
    pub hits: HashMap<String, usize>,
    /// Bodies of submitted orders, as received.
    pub order_bodies: Vec<Value>,
}

impl MockState {
    /// State with a small catalog.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            products: vec![
                json!({
                    "_id": "p-rose",
                    "name": "Rooh Gulab",
                    "slug": "rooh-gulab",
                    "categoryId": "cat-attar",
                    "price": 450,
                    "regularPrice": 500,
                    "productImage": ["rose.jpg"],
                    "description": "Steam-distilled rose attar",
                }),
                json!({
                    "_id": "p-oud",
                    "name": "Oud Noir",
                    "slug": "oud-noir",
                    "categoryId": "cat-missing",
                    "price": "1200",
                    "productImage": [{"filename": "oud.jpg"}],
                }),
                json!({
                    "_id": "p-vetiver",
                    "name": "Khus",
                    "slug": "khus",
                    "price": 300,
                    "regularPrice": 0,
                    "status": "inactive",
                }),
            ],
            categories: vec![json!({
                "_id": "cat-attar",
                "categoryName": "Attars",
                "slug": "attars",
            })],
            ..Self::default()
        }
    }

    fn product(&self, product_id: &str) -> Option<&Value> {
        self.products
            .iter()
            .find(|p| p.get("_id").and_then(Value::as_str) == Some(product_id))
    }

    fn render_line(&self, index: usize, product_id: &str, quantity: u32) -> Value {
        let product = self
            .product(product_id)
            .cloned()
            .unwrap_or_else(|| json!({"_id": product_id}));
        let wrapped = match self.cart_shape {
            CartShape::Wrapped => true,
            CartShape::Bare => false,
            CartShape::Mixed => index % 2 == 0,
        };
        if wrapped {
            json!({
                "_id": format!("c-{product_id}"),
                "cartProduct": product,
                "selQty": quantity,
            })
        } else {
            let mut bare = product;
            if let Some(map) = bare.as_object_mut() {
                map.insert("selQty".to_string(), json!(quantity));
            }
            bare
        }
    }

    fn render_cart(&self, user_id: &str) -> Value {
        match self.carts.get(user_id) {
            Some(lines) if !lines.is_empty() => Value::Array(
                lines
                    .iter()
                    .enumerate()
                    .map(|(i, (product_id, qty))| self.render_line(i, product_id, *qty))
                    .collect(),
            ),
            _ => Value::Null,
        }
    }

    /// Quantity of `product_id` in `user_id`'s server-side cart.
    #[must_use]
    pub fn quantity(&self, user_id: &str, product_id: &str) -> Option<u32> {
        self.carts
            .get(user_id)?
            .iter()
            .find(|(id, _)| id == product_id)
            .map(|(_, qty)| *qty)
    }
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ok(response: Value) -> Json<Value> {
    Json(json!({
        "baseResponse": {"status": 1, "message": "Success"},
        "response": response,
    }))
}

fn rejected(message: &str) -> Json<Value> {
    Json(json!({
        "baseResponse": {"status": 0, "message": message},
        "response": null,
    }))
}

// =============================================================================
// MockApi
// =============================================================================

/// A running mock of the Velorm API on an ephemeral local port.
///
/// The server task is aborted when the value is dropped.
pub struct MockApi {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl MockApi {
    /// Start a mock with the seeded catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(MockState::seeded()).await
    }

    /// Start a mock over `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start_with(state: MockState) -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(state));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock API stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL including the `/api/v1` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Storefront configuration pointing at this mock.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig {
            api_base_url: self.base_url(),
            request_timeout: Duration::from_secs(5),
            ..StorefrontConfig::default()
        }
    }

    /// A storefront over fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn storefront(&self) -> Result<Storefront, StoreError> {
        self.storefront_with(Arc::new(MemoryStorage::new()))
    }

    /// A storefront over `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn storefront_with(&self, storage: Arc<dyn Storage>) -> Result<Storefront, StoreError> {
        Storefront::with_storage(self.config(), storage)
    }

    /// Inspect or change the mock's state.
    pub fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        f(&mut lock(&self.state))
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/v1/login/otp-by-contact", post(send_otp))
        .route("/api/v1/login/authenticate", post(authenticate))
        .route("/api/v1/login/add-user-details", post(add_user_details))
        .route("/api/v1/cart/get-cart-by-user/{user_id}", get(get_cart))
        .route(
            "/api/v1/cart/add-to-cart/{product_id}/{user_id}",
            post(add_to_cart),
        )
        .route(
            "/api/v1/cart/delete-to-cart/{product_id}/{user_id}",
            get(delete_from_cart),
        )
        .route("/api/v1/order/create-new-order", post(create_order))
        .route("/api/v1/order/get-all-orders", get(get_all_orders))
        .route("/api/v1/product/get-all-products", get(get_products))
        .route(
            "/api/v1/product/get-product-by-slug/{slug}",
            get(get_product_by_slug),
        )
        .route("/api/v1/category/get-all-categories", get(get_categories))
        .with_state(state)
}

// =============================================================================
// Login
// =============================================================================

fn contact_of(body: &Value) -> String {
    match body.get("contact") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

async fn send_otp(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let contact = contact_of(&body);
    if contact == BLOCKED_CONTACT {
        return rejected("This number is blocked");
    }
    lock(&state).users.entry(contact.clone()).or_insert_with(|| {
        json!({
            "_id": format!("u-{contact}"),
            "contact": contact.parse::<u64>().map_or_else(|_| json!(contact), |n| json!(n)),
            "walletBalance": 0,
        })
    });
    ok(json!({"otpSent": true}))
}

async fn authenticate(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let contact = contact_of(&body);
    if body.get("otp").and_then(Value::as_str) != Some(VALID_OTP) {
        return rejected("Invalid OTP");
    }
    let Some(user) = lock(&state).users.get(&contact).cloned() else {
        return rejected("Invalid OTP");
    };
    // Verification puts the user under `details`, unlike every other call.
    Json(json!({
        "baseResponse": {"status": 1, "message": "Verified"},
        "details": user,
    }))
}

async fn add_user_details(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let contact = contact_of(&body);
    let mut state = lock(&state);
    let Some(user) = state.users.get_mut(&contact) else {
        return rejected("User not found");
    };
    if let Some(map) = user.as_object_mut() {
        for field in ["name", "email"] {
            if let Some(value) = body.get(field) {
                map.insert(field.to_string(), value.clone());
            }
        }
    }
    ok(user.clone())
}

// =============================================================================
// Cart
// =============================================================================

async fn get_cart(State(state): State<Shared>, Path(user_id): Path<String>) -> Json<Value> {
    let (response, delay) = {
        let state = lock(&state);
        let response = state
            .cart_override
            .clone()
            .unwrap_or_else(|| state.render_cart(&user_id));
        (response, state.cart_fetch_delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    ok(response)
}

async fn add_to_cart(
    State(state): State<Shared>,
    Path((product_id, user_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let decrement = body.get("dec").and_then(Value::as_bool).unwrap_or(false);
    let mut state = lock(&state);
    let lines = state.carts.entry(user_id).or_default();

    let position = lines.iter().position(|(id, _)| *id == product_id);
    let line = match (position, decrement) {
        (Some(i), true) => {
            let remaining = lines.get(i).map_or(0, |(_, qty)| qty.saturating_sub(1));
            if remaining == 0 {
                lines.remove(i);
                return ok(Value::Null);
            }
            if let Some(line) = lines.get_mut(i) {
                line.1 = remaining;
            }
            (i, remaining)
        }
        (Some(i), false) => {
            let quantity = lines.get(i).map_or(1, |(_, qty)| qty + 1);
            if let Some(line) = lines.get_mut(i) {
                line.1 = quantity;
            }
            (i, quantity)
        }
        (None, true) => return ok(Value::Null),
        (None, false) => {
            lines.push((product_id.clone(), 1));
            (lines.len() - 1, 1)
        }
    };
    ok(state.render_line(line.0, &product_id, line.1))
}

async fn delete_from_cart(
    State(state): State<Shared>,
    Path((product_id, user_id)): Path<(String, String)>,
) -> Json<Value> {
    if let Some(lines) = lock(&state).carts.get_mut(&user_id) {
        lines.retain(|(id, _)| *id != product_id);
    }
    Json(json!({"message": "Removed"}))
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    if state.fail_orders {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "Order service unavailable"})),
        )
            .into_response();
    }
    state.order_bodies.push(body.clone());

    if body.get("amount").and_then(Value::as_f64).unwrap_or(0.0) <= 0.0 {
        return rejected("Invalid order amount").into_response();
    }

    let mut order = body;
    if let Some(map) = order.as_object_mut() {
        map.insert(
            "_id".to_string(),
            json!(format!("o-{}", state.orders.len() + 1)),
        );
        map.insert("status".to_string(), json!("ordered"));
        map.insert("createdAt".to_string(), json!("2026-03-04T05:06:07.000Z"));
    }
    state.orders.push(order.clone());
    ok(order).into_response()
}

async fn get_all_orders(State(state): State<Shared>) -> Json<Value> {
    ok(Value::Array(lock(&state).orders.clone()))
}

// =============================================================================
// Catalog
// =============================================================================

fn catalog_hit(state: &mut MockState, path: &str) -> Option<Response> {
    *state.hits.entry(path.to_string()).or_default() += 1;
    if state.rate_limit_catalog {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"message": "Slow down"})),
        )
            .into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("7"));
        return Some(response);
    }
    None
}

async fn get_products(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    if let Some(limited) = catalog_hit(&mut state, "products") {
        return limited;
    }
    ok(Value::Array(state.products.clone())).into_response()
}

async fn get_categories(State(state): State<Shared>) -> Response {
    let mut state = lock(&state);
    if let Some(limited) = catalog_hit(&mut state, "categories") {
        return limited;
    }
    ok(Value::Array(state.categories.clone())).into_response()
}

async fn get_product_by_slug(State(state): State<Shared>, Path(slug): Path<String>) -> Response {
    let mut state = lock(&state);
    if let Some(limited) = catalog_hit(&mut state, "product") {
        return limited;
    }
    let product = state
        .products
        .iter()
        .find(|p| p.get("slug").and_then(Value::as_str) == Some(slug.as_str()))
        .cloned()
        .unwrap_or(Value::Null);
    ok(product).into_response()
}
