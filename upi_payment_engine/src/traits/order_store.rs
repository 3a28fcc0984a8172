use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderStoreError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {order_id} is {current}, which is not one of the expected prior states")]
    Conflict { order_id: OrderId, current: OrderStatusType },
    #[error("None of the expected prior states may move to {next}")]
    IllegalTransition { next: OrderStatusType },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// Durable storage for orders.
///
/// Backends must make [`Self::transition`] atomic per order: a concurrent reader sees either the record before the
/// transition or after it, never a mix. Operations on different orders must not block each other.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// The URL (or a descriptive name) of the backing store.
    fn url(&self) -> &str;

    /// Stores a brand-new order in the `CREATED` state.
    ///
    /// Fails with [`OrderStoreError::OrderAlreadyExists`] if the order id has been used before.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;

    /// The only mutation primitive for existing orders.
    ///
    /// If the order's current status is one of `expected`, `patch` is applied and, if `next` is given, the status is
    /// set to `next`, all in one atomic step. The updated record is returned.
    ///
    /// * `next = None` leaves the status untouched. This is how annotations (e.g. a UTR) are recorded.
    /// * If `next` is given, states in `expected` that the state machine does not allow to move to `next` are ignored.
    ///   If none are left, the call fails with [`OrderStoreError::IllegalTransition`] without touching the store.
    /// * If the current status is not acceptable, nothing is written and [`OrderStoreError::Conflict`] carries the
    ///   current status so the caller can decide what to do without a second read.
    async fn transition(
        &self,
        order_id: &OrderId,
        expected: &[OrderStatusType],
        next: Option<OrderStatusType>,
        patch: OrderPatch,
    ) -> Result<Order, OrderStoreError>;

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

/// Narrows `expected` down to the states that may legally move to `next`.
pub(crate) fn allowed_prior_states(
    expected: &[OrderStatusType],
    next: Option<OrderStatusType>,
) -> Result<Vec<OrderStatusType>, OrderStoreError> {
    let allowed = match next {
        Some(next) => expected.iter().copied().filter(|s| s.can_transition_to(next)).collect::<Vec<_>>(),
        None => expected.to_vec(),
    };
    match (allowed.is_empty(), next) {
        (true, Some(next)) => Err(OrderStoreError::IllegalTransition { next }),
        _ => Ok(allowed),
    }
}
