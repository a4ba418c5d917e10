//! Order submission and history.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use velorm_core::{RequestStatus, UserId};

use crate::api::VelormClient;
use crate::checkout::OrderPayload;
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::models::OrderRecord;

/// Snapshot of order activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderState {
    /// Confirmation of the last successful submission.
    pub current_order: Option<JsonValue>,
    /// The user's orders from the last history fetch.
    pub orders: Vec<OrderRecord>,
    pub status: RequestStatus,
    pub error: Option<String>,
}

impl OrderState {
    fn begin(&mut self) {
        self.status = RequestStatus::Loading;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        self.status = RequestStatus::Failed;
        self.error = Some(message);
    }

    fn order_created(&mut self, confirmation: JsonValue) {
        self.current_order = Some(confirmation);
        self.status = RequestStatus::Succeeded;
    }

    fn orders_loaded(&mut self, orders: Vec<OrderRecord>) {
        self.orders = orders;
        self.status = RequestStatus::Succeeded;
    }
}

/// Keep only the orders placed by `user_id`.
#[must_use]
pub fn orders_for(orders: Vec<OrderRecord>, user_id: &UserId) -> Vec<OrderRecord> {
    orders
        .into_iter()
        .filter(|order| order.belongs_to(user_id))
        .collect()
}

// =============================================================================
// OrderStore
// =============================================================================

/// Submits orders and tracks the result.
///
/// Placing an order never touches the cart; the backend owns clearing it.
#[derive(Clone)]
pub struct OrderStore {
    inner: Arc<OrderStoreInner>,
}

struct OrderStoreInner {
    client: VelormClient,
    state: RwLock<OrderState>,
}

impl OrderStore {
    #[must_use]
    pub fn new(client: VelormClient) -> Self {
        Self {
            inner: Arc::new(OrderStoreInner {
                client,
                state: RwLock::new(OrderState::default()),
            }),
        }
    }

    /// Current order snapshot.
    pub async fn snapshot(&self) -> OrderState {
        self.inner.state.read().await.clone()
    }

    /// Submit an assembled order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the
    /// order; the state is marked failed with the message.
    #[instrument(skip(self, payload), fields(user_id = %payload.user.id, amount = %payload.amount))]
    pub async fn create_order(&self, payload: &OrderPayload) -> Result<JsonValue> {
        add_breadcrumb("order", "Placing order", None);
        self.inner.state.write().await.begin();
        let outcome = self
            .inner
            .client
            .create_order(payload)
            .await
            .map_err(StoreError::from);

        let mut state = self.inner.state.write().await;
        match &outcome {
            Ok(confirmation) => {
                state.order_created(confirmation.clone());
                info!(lines = payload.product.len(), "Order placed");
            }
            Err(e) => state.fail(e.user_message()),
        }
        outcome
    }

    /// Load the order history of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; the previous history is kept.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_orders(&self, user_id: &UserId) -> Result<Vec<OrderRecord>> {
        self.inner.state.write().await.begin();
        let outcome = self
            .inner
            .client
            .get_all_orders()
            .await
            .map(|orders| orders_for(orders, user_id))
            .map_err(StoreError::from);

        let mut state = self.inner.state.write().await;
        match &outcome {
            Ok(orders) => state.orders_loaded(orders.clone()),
            Err(e) => state.fail(e.user_message()),
        }
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use velorm_core::OrderStatus;

    fn records(value: JsonValue) -> Vec<OrderRecord> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_orders_for_filters_by_user() {
        let orders = records(json!([
            {"_id": "o-1", "user": {"_id": "u-1"}, "status": "shipped"},
            {"_id": "o-2", "user": {"_id": "u-2"}},
            {"_id": "o-3", "user": "u-1"},
            {"_id": "o-4"},
        ]));

        let mine = orders_for(orders, &UserId::new("u-1"));
        let ids: Vec<&str> = mine
            .iter()
            .filter_map(|o| o.id.as_ref().map(velorm_core::OrderId::as_str))
            .collect();
        assert_eq!(ids, vec!["o-1", "o-3"]);
        assert_eq!(mine.first().unwrap().status, OrderStatus::Shipped);
    }

    #[test]
    fn test_failure_keeps_previous_order() {
        let mut state = OrderState::default();
        state.begin();
        state.order_created(json!({"_id": "o-1"}));

        state.begin();
        state.fail("Failed to create order".to_string());

        assert_eq!(state.status, RequestStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("Failed to create order"));
        assert_eq!(state.current_order, Some(json!({"_id": "o-1"})));
    }

    #[test]
    fn test_orders_loaded() {
        let mut state = OrderState::default();
        state.begin();
        assert!(state.status.is_loading());

        state.orders_loaded(records(json!([{"_id": "o-1"}])));
        assert_eq!(state.status, RequestStatus::Succeeded);
        assert_eq!(state.orders.len(), 1);
    }
}
