use thiserror::Error;

use crate::{
    db_types::OrderId,
    helpers::SignatureError,
    traits::{GatewayError, OrderStoreError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The message signature is invalid")]
    InvalidSignature,
    #[error("The message is addressed to merchant {0}")]
    ForeignMerchant(String),
    #[error("The message timestamp {0} is outside the accepted window")]
    StaleRequest(String),
    #[error("Gateway error. {0}")]
    GatewayError(GatewayError),
    #[error(
        "The gateway did not answer in time while creating order {order_id}. The order may exist on the gateway. Query \
         its status there before retrying."
    )]
    GatewayTimeout { order_id: OrderId },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Storage error. {0}")]
    StoreError(String),
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            e => Self::StoreError(e.to_string()),
        }
    }
}

impl From<SignatureError> for OrderFlowError {
    fn from(e: SignatureError) -> Self {
        Self::ValidationError(e.to_string())
    }
}
