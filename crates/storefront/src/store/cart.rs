//! Cart mirror with per-product request sequencing.
//!
//! Every request takes a ticket from a monotonic counter before it is sent.
//! When its response lands, the ticket decides whether it may be applied:
//!
//! - a fetch applies only if no newer fetch has been applied, and keeps the
//!   local entry of any product mutated after the fetch was issued
//! - a mutation applies only if it is newer than the last applied fetch and
//!   the last applied mutation of the same product
//!
//! Stale responses are logged and dropped, so the last request issued wins
//! rather than the last response received.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use velorm_core::{CartAction, CurrencyCode, ProductId, RequestStatus, UserId};

use crate::api::VelormClient;
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::models::CartItem;
use crate::normalize::{self, normalize_entries, normalize_mutation};
use crate::pricing::CartTotals;

/// Snapshot of the cart.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    /// At most one entry per product id.
    pub items: Vec<CartItem>,
    pub status: RequestStatus,
    pub error: Option<String>,
    sequence: Sequence,
}

#[derive(Debug, Clone, Default)]
struct Sequence {
    last_issued: u64,
    /// Ticket of the last applied fetch.
    floor: u64,
    /// Ticket of the last applied mutation per product, newer than `floor`.
    applied: HashMap<ProductId, u64>,
}

impl Sequence {
    const fn issue(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    fn is_stale_mutation(&self, ticket: u64, product_id: &ProductId) -> bool {
        ticket < self.floor
            || self
                .applied
                .get(product_id)
                .is_some_and(|&last| last > ticket)
    }

    fn mutated_after(&self, ticket: u64, product_id: &ProductId) -> bool {
        self.applied.get(product_id).is_some_and(|&last| last > ticket)
    }
}

impl CartState {
    /// Reserve a ticket for a request about to be sent.
    pub const fn issue_ticket(&mut self) -> u64 {
        self.sequence.issue()
    }

    /// Replace the item list with a fetched one.
    ///
    /// Returns `false` (state unchanged) if a newer fetch was already applied.
    pub fn apply_fetch(&mut self, ticket: u64, fetched: Vec<CartItem>) -> bool {
        if ticket < self.sequence.floor {
            return false;
        }

        let mut merged = Vec::with_capacity(fetched.len());
        for item in fetched {
            if !self.sequence.mutated_after(ticket, item.product_id()) {
                normalize::upsert(&mut merged, item);
            } else if let Some(local) = self
                .items
                .iter()
                .find(|local| local.product_id() == item.product_id())
            {
                normalize::upsert(&mut merged, local.clone());
            }
        }
        // Entries changed by later mutations keep their local value; products
        // removed by a later mutation stay removed.
        for item in &self.items {
            if self.sequence.mutated_after(ticket, item.product_id()) {
                normalize::upsert(&mut merged, item.clone());
            }
        }

        self.items = merged;
        self.sequence.floor = ticket;
        self.sequence.applied.retain(|_, last| *last > ticket);
        true
    }

    /// Upsert a mutation response for `product_id`.
    ///
    /// `None` (the backend returned nothing) records the ticket without
    /// touching the items. Returns `false` if the response is stale.
    pub fn apply_upsert(
        &mut self,
        ticket: u64,
        product_id: &ProductId,
        item: Option<CartItem>,
    ) -> bool {
        if self.sequence.is_stale_mutation(ticket, product_id) {
            return false;
        }
        self.sequence.applied.insert(product_id.clone(), ticket);
        if let Some(item) = item {
            normalize::upsert(&mut self.items, item);
        }
        true
    }

    /// Remove `product_id` after a confirmed deletion.
    ///
    /// Returns `false` if the response is stale.
    pub fn apply_removal(&mut self, ticket: u64, product_id: &ProductId) -> bool {
        if self.sequence.is_stale_mutation(ticket, product_id) {
            return false;
        }
        self.sequence.applied.insert(product_id.clone(), ticket);
        self.items.retain(|item| item.product_id() != product_id);
        true
    }

    /// Quantity of `product_id` in the cart, if present.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id() == product_id)
            .map(|item| item.quantity)
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    fn begin(&mut self) -> u64 {
        self.status = RequestStatus::Loading;
        self.error = None;
        self.issue_ticket()
    }

    const fn succeed(&mut self) {
        self.status = RequestStatus::Succeeded;
    }

    fn fail(&mut self, message: String) {
        self.status = RequestStatus::Failed;
        self.error = Some(message);
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Local mirror of the server-side cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    client: VelormClient,
    state: RwLock<CartState>,
}

impl CartStore {
    #[must_use]
    pub fn new(client: VelormClient) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                client,
                state: RwLock::new(CartState::default()),
            }),
        }
    }

    /// Current cart snapshot.
    pub async fn snapshot(&self) -> CartState {
        self.inner.state.read().await.clone()
    }

    pub async fn items(&self) -> Vec<CartItem> {
        self.inner.state.read().await.items.clone()
    }

    /// Total number of units in the cart.
    pub async fn item_count(&self) -> u32 {
        self.inner.state.read().await.item_count()
    }

    /// Subtotal, shipping and total for the current items.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Pricing` if the totals overflow.
    pub async fn totals(&self, shipping: Decimal, currency: CurrencyCode) -> Result<CartTotals> {
        let state = self.inner.state.read().await;
        Ok(CartTotals::compute(&state.items, shipping, currency)?)
    }

    /// Replace the local cart with the server's.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or any entry has an
    /// unrecognised shape. The local cart is left unchanged.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>> {
        let ticket = self.inner.state.write().await.begin();
        let outcome = self.load(user_id).await;

        let mut state = self.inner.state.write().await;
        match outcome {
            Ok(items) => {
                if !state.apply_fetch(ticket, items) {
                    warn!(ticket, "Discarding stale cart fetch");
                }
                state.succeed();
                debug!(count = state.items.len(), "Cart fetched");
                Ok(state.items.clone())
            }
            Err(e) => {
                state.fail(e.user_message());
                Err(e)
            }
        }
    }

    async fn load(&self, user_id: &UserId) -> Result<Vec<CartItem>> {
        let response = self.inner.client.get_cart(user_id).await?;
        Ok(normalize_entries(response.as_ref())?)
    }

    /// Add a product, merging `product_data` into the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has an
    /// unrecognised shape.
    #[instrument(skip(self, product_data), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
        product_data: Option<&JsonValue>,
    ) -> Result<()> {
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
        self.mutate(product_id, user_id, product_data, CartAction::Inc)
            .await
    }

    /// Increment or decrement a product's quantity.
    ///
    /// No local policy is applied: a `Dec` at quantity 1 is sent as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has an
    /// unrecognised shape.
    #[instrument(skip(self), fields(product_id = %product_id, user_id = %user_id, action = %action))]
    pub async fn update_cart_item(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
        action: CartAction,
    ) -> Result<()> {
        let action_name = action.to_string();
        add_breadcrumb(
            "cart",
            "Updated cart quantity",
            Some(&[
                ("product_id", product_id.as_str()),
                ("action", action_name.as_str()),
            ]),
        );
        self.mutate(product_id, user_id, None, action).await
    }

    async fn mutate(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
        product_data: Option<&JsonValue>,
        action: CartAction,
    ) -> Result<()> {
        let ticket = self.inner.state.write().await.begin();
        let outcome = self.send_mutation(product_id, user_id, product_data, action).await;

        let mut state = self.inner.state.write().await;
        match outcome {
            Ok(item) => {
                if !state.apply_upsert(ticket, product_id, item) {
                    warn!(ticket, product_id = %product_id, "Discarding stale cart response");
                }
                state.succeed();
                Ok(())
            }
            Err(e) => {
                state.fail(e.user_message());
                Err(e)
            }
        }
    }

    async fn send_mutation(
        &self,
        product_id: &ProductId,
        user_id: &UserId,
        product_data: Option<&JsonValue>,
        action: CartAction,
    ) -> Result<Option<CartItem>> {
        let response = self
            .inner
            .client
            .add_to_cart(product_id, user_id, product_data, action)
            .await?;
        Ok(normalize_mutation(response.as_ref())?)
    }

    /// Remove a product. The local entry is dropped whatever the response
    /// body says.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId, user_id: &UserId) -> Result<()> {
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
        let ticket = self.inner.state.write().await.begin();
        let outcome = self.inner.client.delete_from_cart(product_id, user_id).await;

        let mut state = self.inner.state.write().await;
        match outcome {
            Ok(()) => {
                if !state.apply_removal(ticket, product_id) {
                    warn!(ticket, product_id = %product_id, "Discarding stale cart removal");
                }
                state.succeed();
                Ok(())
            }
            Err(e) => {
                let e = StoreError::from(e);
                state.fail(e.user_message());
                Err(e)
            }
        }
    }

    /// Decrement a product, deleting it server-side when its quantity is 1.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotInCart` if the product is not in the local
    /// cart, or an error if the request fails.
    #[instrument(skip(self), fields(product_id = %product_id, user_id = %user_id))]
    pub async fn decrement_or_remove(&self, product_id: &ProductId, user_id: &UserId) -> Result<()> {
        let quantity = self.inner.state.read().await.quantity_of(product_id);
        match quantity {
            None => Err(StoreError::NotInCart(product_id.clone())),
            Some(quantity) if quantity > 1 => {
                self.update_cart_item(product_id, user_id, CartAction::Dec)
                    .await
            }
            Some(_) => self.remove_from_cart(product_id, user_id).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::normalize_entry;
    use serde_json::json;

    fn item(id: &str, quantity: u32) -> CartItem {
        normalize_entry(&json!({"_id": id, "price": 100, "selQty": quantity})).unwrap()
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn quantities(state: &CartState) -> Vec<(String, u32)> {
        state
            .items
            .iter()
            .map(|item| (item.product_id().to_string(), item.quantity))
            .collect()
    }

    #[test]
    fn test_item_count_saturates() {
        let mut state = CartState::default();
        for id in ["A", "B"] {
            let ticket = state.issue_ticket();
            state.apply_upsert(ticket, &pid(id), Some(item(id, 4_000_000_000)));
        }
        assert_eq!(state.item_count(), u32::MAX);
    }

    #[test]
    fn test_upserts_never_duplicate() {
        let mut state = CartState::default();
        for (id, qty) in [("A", 1), ("B", 1), ("A", 2), ("C", 1), ("A", 3)] {
            let ticket = state.issue_ticket();
            assert!(state.apply_upsert(ticket, &pid(id), Some(item(id, qty))));
        }

        assert_eq!(
            quantities(&state),
            vec![("A".to_string(), 3), ("B".to_string(), 1), ("C".to_string(), 1)]
        );
        assert_eq!(state.item_count(), 5);
    }

    #[test]
    fn test_null_mutation_response_changes_nothing() {
        let mut state = CartState::default();
        let ticket = state.issue_ticket();
        state.apply_upsert(ticket, &pid("A"), Some(item("A", 1)));

        let ticket = state.issue_ticket();
        assert!(state.apply_upsert(ticket, &pid("A"), None));
        assert_eq!(quantities(&state), vec![("A".to_string(), 1)]);
    }

    #[test]
    fn test_stale_mutation_discarded() {
        let mut state = CartState::default();
        let inc = state.issue_ticket();
        let dec = state.issue_ticket();

        // The later request lands first.
        assert!(state.apply_upsert(dec, &pid("A"), Some(item("A", 1))));
        assert!(!state.apply_upsert(inc, &pid("A"), Some(item("A", 3))));
        assert_eq!(quantities(&state), vec![("A".to_string(), 1)]);
    }

    #[test]
    fn test_sequencing_is_per_product() {
        let mut state = CartState::default();
        let a = state.issue_ticket();
        let b = state.issue_ticket();

        assert!(state.apply_upsert(b, &pid("B"), Some(item("B", 1))));
        assert!(state.apply_upsert(a, &pid("A"), Some(item("A", 1))));
        assert_eq!(state.items.len(), 2);
    }

    #[test]
    fn test_stale_upsert_after_removal() {
        let mut state = CartState::default();
        let ticket = state.issue_ticket();
        state.apply_upsert(ticket, &pid("A"), Some(item("A", 2)));

        let inc = state.issue_ticket();
        let remove = state.issue_ticket();
        assert!(state.apply_removal(remove, &pid("A")));
        assert!(!state.apply_upsert(inc, &pid("A"), Some(item("A", 3))));
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_removal_of_absent_product() {
        let mut state = CartState::default();
        let ticket = state.issue_ticket();
        assert!(state.apply_removal(ticket, &pid("A")));
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_fetch_replaces_items() {
        let mut state = CartState::default();
        let ticket = state.issue_ticket();
        state.apply_upsert(ticket, &pid("A"), Some(item("A", 1)));

        let fetch = state.issue_ticket();
        assert!(state.apply_fetch(fetch, vec![item("B", 2), item("C", 1)]));
        assert_eq!(
            quantities(&state),
            vec![("B".to_string(), 2), ("C".to_string(), 1)]
        );
    }

    #[test]
    fn test_older_fetch_discarded() {
        let mut state = CartState::default();
        let first = state.issue_ticket();
        let second = state.issue_ticket();

        assert!(state.apply_fetch(second, vec![item("A", 2)]));
        assert!(!state.apply_fetch(first, vec![item("A", 5), item("B", 1)]));
        assert_eq!(quantities(&state), vec![("A".to_string(), 2)]);
    }

    #[test]
    fn test_fetch_keeps_later_mutations() {
        let mut state = CartState::default();
        let seed = state.issue_ticket();
        state.apply_fetch(seed, vec![item("A", 1), item("B", 1)]);

        let fetch = state.issue_ticket();
        let inc = state.issue_ticket();
        let remove = state.issue_ticket();
        assert!(state.apply_upsert(inc, &pid("A"), Some(item("A", 2))));
        assert!(state.apply_removal(remove, &pid("B")));

        // The fetch was issued before both mutations, so it cannot see them.
        assert!(state.apply_fetch(fetch, vec![item("A", 1), item("B", 1), item("C", 4)]));
        assert_eq!(
            quantities(&state),
            vec![("A".to_string(), 2), ("C".to_string(), 4)]
        );
    }

    #[test]
    fn test_mutation_older_than_fetch_discarded() {
        let mut state = CartState::default();
        let inc = state.issue_ticket();
        let fetch = state.issue_ticket();

        assert!(state.apply_fetch(fetch, vec![item("A", 4)]));
        assert!(!state.apply_upsert(inc, &pid("A"), Some(item("A", 1))));
        assert_eq!(quantities(&state), vec![("A".to_string(), 4)]);
    }

    #[test]
    fn test_status_transitions() {
        let mut state = CartState::default();
        state.begin();
        assert!(state.status.is_loading());

        state.fail("Network error".to_string());
        assert_eq!(state.status, RequestStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Network error"));

        state.begin();
        assert!(state.error.is_none());
        state.succeed();
        assert_eq!(state.status, RequestStatus::Succeeded);
    }

    #[test]
    fn test_quantity_of() {
        let mut state = CartState::default();
        let ticket = state.issue_ticket();
        state.apply_fetch(ticket, vec![item("A", 3)]);

        assert_eq!(state.quantity_of(&pid("A")), Some(3));
        assert_eq!(state.quantity_of(&pid("B")), None);
    }
}
