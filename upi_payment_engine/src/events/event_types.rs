use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
}

impl OrderFailedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The gateway reported a terminal status that disagrees with the terminal status we already hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackDisputeEvent {
    pub order: Order,
    pub stored: OrderStatusType,
    pub reported: OrderStatusType,
    /// The verified callback body that raised the dispute.
    pub payload: String,
}
