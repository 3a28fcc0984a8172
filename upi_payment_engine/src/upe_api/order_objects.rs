use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use upi_common::Paise;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PayType, ReconcileStatus},
    helpers::parse_gateway_timestamp,
    upe_api::errors::OrderFlowError,
};

/// What the payer needs to complete a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub pay_url: String,
    pub qr_payload: Option<String>,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderRequest {
    pub amount: Paise,
    pub pay_type: PayType,
    /// Free-form client data. Must be a JSON object if given.
    pub metadata: Option<serde_json::Value>,
}

impl NewOrderRequest {
    pub fn new(amount: Paise, pay_type: PayType) -> Self {
        Self { amount, pay_type, metadata: None }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// How a verified callback was handled. Every variant is acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The callback moved the order to a terminal state.
    Applied(Order),
    /// The order was already in the reported terminal state. Nothing changed.
    Duplicate { order_id: OrderId, status: OrderStatusType },
    /// The order was already terminal with a different status. Nothing changed and an alert was raised.
    Disputed { order_id: OrderId, stored: OrderStatusType, reported: OrderStatusType },
    /// The gateway reported a non-terminal status.
    InProgress { order_id: OrderId, status: OrderStatusType },
    /// We have no record of the order.
    UnknownOrder(OrderId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub order_id: OrderId,
    pub status: ReconcileStatus,
    pub utr: Option<String>,
}

/// The result of asking the gateway for an order's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRefresh {
    pub order: Order,
    /// `false` if the gateway was not asked (the order is already final) or could not answer.
    pub refreshed: bool,
    pub error: Option<String>,
}

/// The fields of a gateway callback that the order flow acts on, pulled out of a verified parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallback {
    pub merchant_id: String,
    pub order_id: OrderId,
    pub platform_order_id: Option<String>,
    pub trade_status: String,
    pub amount: Option<Paise>,
    pub timestamp: DateTime<Utc>,
}

impl GatewayCallback {
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, OrderFlowError> {
        let required = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| OrderFlowError::ValidationError(format!("Callback is missing '{key}'")))
        };
        let merchant_id = required("mchId")?.to_string();
        let order_id = OrderId(required("outTradeNo")?.to_string());
        let trade_status = required("tradeStatus")?.to_ascii_uppercase();
        let raw_ts = required("timestamp")?;
        let timestamp = parse_gateway_timestamp(raw_ts)
            .ok_or_else(|| OrderFlowError::ValidationError(format!("Callback timestamp '{raw_ts}' is not valid")))?;
        let platform_order_id = params.get("transactionId").filter(|v| !v.is_empty()).cloned();
        let amount = params.get("amount").and_then(|a| match a.parse::<Paise>() {
            Ok(amount) => Some(amount),
            Err(e) => {
                warn!("📞️ Ignoring unreadable amount in callback for {order_id}. {e}");
                None
            },
        });
        Ok(Self { merchant_id, order_id, platform_order_id, trade_status, amount, timestamp })
    }
}

/// Maps a gateway `tradeStatus` to the terminal status it implies. `None` means the payment is still in progress.
///
/// Only a success report pays an order. The gateway's in-progress states are recognised by name, and any other value,
/// including ones it has never sent before, fails the order.
pub fn map_trade_status(trade_status: &str) -> Option<OrderStatusType> {
    match trade_status.trim().to_ascii_uppercase().as_str() {
        "SUCCESS" | "PAID" => Some(OrderStatusType::Paid),
        "CREATED" | "PENDING" | "PROCESSING" | "PAYING" | "USERPAYING" | "NOTPAY" | "WAITING" => None,
        _ => Some(OrderStatusType::Failed),
    }
}
