//! Velorm Storefront library.
//!
//! Client-side state for the Velorm shop: an OTP session, a local mirror of
//! the server-side cart, and order submission. The remote REST API owns the
//! durable data; this crate keeps a consistent cache of it.
//!
//! # Modules
//!
//! - [`api`] - HTTP client for the Velorm REST API with catalog caching
//! - [`store`] - auth, cart, and order stores
//! - [`normalize`] - cart entry normalization across response shapes
//! - [`identity`] - authenticated or guest user id resolution
//! - [`checkout`] - order payload assembly
//! - [`pricing`] - cart totals
//! - [`storage`] - persistent key/value storage adapters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod normalize;
pub mod pricing;
pub mod storage;
pub mod store;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::instrument;

use velorm_core::UserId;

use crate::api::VelormClient;
use crate::checkout::{CheckoutForm, OrderPayload};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::storage::{FileStorage, Storage};
use crate::store::{AuthStore, CartStore, OrderStore};

/// Everything a front end needs: configuration, API client, identity and
/// the three stores, sharing one storage backend.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Storefront {
    pub config: Arc<StorefrontConfig>,
    pub client: VelormClient,
    pub identity: IdentityResolver,
    pub auth: AuthStore,
    pub cart: CartStore,
    pub orders: OrderStore,
}

impl Storefront {
    /// Build a storefront persisting state under `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be opened or the
    /// API client cannot be built.
    pub fn from_config(config: StorefrontConfig) -> Result<Self> {
        let storage = FileStorage::open(&config.storage_dir)?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build a storefront over an existing storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built.
    pub fn with_storage(config: StorefrontConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let client = VelormClient::new(&config)?;
        Ok(Self {
            identity: IdentityResolver::new(Arc::clone(&storage)),
            auth: AuthStore::new(client.clone(), storage),
            cart: CartStore::new(client.clone()),
            orders: OrderStore::new(client.clone()),
            client,
            config: Arc::new(config),
        })
    }

    /// The id to use for cart and order calls right now.
    pub async fn effective_user_id(&self) -> UserId {
        let user = self.auth.user().await;
        self.identity.effective_user_id(user.as_ref())
    }

    /// Assemble an order from the current cart and submit it.
    ///
    /// # Errors
    ///
    /// Returns a checkout error if the cart is empty or the form is
    /// incomplete, otherwise any error from submission.
    #[instrument(skip(self, form))]
    pub async fn place_order(&self, form: &CheckoutForm) -> Result<JsonValue> {
        let user_id = self.effective_user_id().await;
        let items = self.cart.items().await;
        let payload =
            OrderPayload::build(&items, form, &user_id, self.config.shipping_fee, Utc::now())?;
        self.orders.create_order(&payload).await
    }
}
