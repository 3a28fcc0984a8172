use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use upi_common::Paise;
use upi_payment_engine::{
    db_types::{OrderId, OrderStatusType, PayType, ReconcileStatus},
    order_objects::{CreatedOrder, NewOrderRequest, StatusRefresh},
};

use crate::errors::ServerError;

/// An amount in rupees, as either a JSON string (`"500.50"`) or a number (`500.5`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RupeeAmount {
    Text(String),
    Number(serde_json::Number),
}

impl RupeeAmount {
    pub fn to_paise(&self) -> Result<Paise, ServerError> {
        let text = match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        };
        text.parse::<Paise>().map_err(|e| ServerError::InvalidRequestBody(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderParams {
    pub amount: RupeeAmount,
    #[serde(default)]
    pub pay_type: PayType,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl TryFrom<CreateOrderParams> for NewOrderRequest {
    type Error = ServerError;

    fn try_from(params: CreateOrderParams) -> Result<Self, Self::Error> {
        let amount = params.amount.to_paise()?;
        let request = NewOrderRequest::new(amount, params.pay_type);
        Ok(match params.metadata {
            Some(metadata) => request.with_metadata(metadata),
            None => request,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub order_id: OrderId,
    pub pay_url: String,
    pub qr_payload: Option<String>,
}

impl From<CreatedOrder> for OrderCreatedResponse {
    fn from(created: CreatedOrder) -> Self {
        Self { order_id: created.order_id, pay_url: created.pay_url, qr_payload: created.qr_payload }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileParams {
    #[serde(default)]
    pub utr: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    pub status: ReconcileStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRefreshResponse {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<StatusRefresh> for StatusRefreshResponse {
    fn from(refresh: StatusRefresh) -> Self {
        Self {
            order_id: refresh.order.order_id,
            status: refresh.order.status,
            refreshed: refresh.refreshed,
            error: refresh.error,
        }
    }
}
