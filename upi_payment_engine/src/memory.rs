//! `MemoryDatabase` is a non-durable [`OrderStore`] for development and tests.
//!
//! Each order lives in its own `DashMap` shard entry. [`OrderStore::transition`] holds that entry's write guard for the
//! check and the write, so it is atomic per order while different orders proceed independently.
use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderPatch, OrderStatusType},
    traits::{allowed_prior_states, OrderStore, OrderStoreError},
};

const MEMORY_URL: &str = "memory";

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    orders: Arc<DashMap<OrderId, Order>>,
    last_id: Arc<AtomicI64>,
}

impl Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryDatabase ({} orders)", self.orders.len())
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl OrderStore for MemoryDatabase {
    fn url(&self) -> &str {
        MEMORY_URL
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Err(OrderStoreError::OrderAlreadyExists(order.order_id)),
            Entry::Vacant(slot) => {
                let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
                let order = order.into_order(id);
                debug!("🗃️ Order {} has been saved in memory with id {id}", order.order_id);
                Ok(slot.insert(order).clone())
            },
        }
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        self.orders
            .get(order_id)
            .map(|o| o.value().clone())
            .ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))
    }

    async fn transition(
        &self,
        order_id: &OrderId,
        expected: &[OrderStatusType],
        next: Option<OrderStatusType>,
        patch: OrderPatch,
    ) -> Result<Order, OrderStoreError> {
        let allowed = allowed_prior_states(expected, next)?;
        let mut entry = self.orders.get_mut(order_id).ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        let order = entry.value_mut();
        if !allowed.contains(&order.status) {
            trace!("🗃️ Order {order_id} is {}, so the transition does not apply", order.status);
            return Err(OrderStoreError::Conflict { order_id: order_id.clone(), current: order.status });
        }
        patch.apply_to(order);
        if let Some(status) = next {
            order.status = status;
        }
        order.updated_at = Utc::now();
        trace!("🗃️ Order {order_id} is now {}", order.status);
        Ok(order.clone())
    }

    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}
