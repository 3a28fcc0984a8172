use chrono::{DateTime, Utc};
use thiserror::Error;
use upi_common::Paise;

use crate::helpers::SignedParams;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The request may or may not have reached the gateway. The outcome is unknown.
    #[error("The gateway did not answer in time")]
    Timeout,
    #[error("Could not reach the gateway. {0}")]
    Transport(String),
    #[error("The gateway rejected the request. [{code}] {message}")]
    Rejected { code: String, message: String },
    #[error("The gateway sent a response we could not understand. {0}")]
    InvalidResponse(String),
}

/// The gateway's answer to a successful order creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayOrder {
    pub platform_order_id: Option<String>,
    pub pay_url: String,
    pub qr_payload: Option<String>,
}

/// The gateway's view of an order, as returned by a status query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayOrderStatus {
    /// The raw `tradeStatus` value, e.g. `SUCCESS`, `FAILED` or `PROCESSING`.
    pub trade_status: String,
    pub actual_amount: Option<Paise>,
    pub platform_order_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The outbound half of the gateway protocol. Parameters arrive already signed.
#[allow(async_fn_in_trait)]
pub trait GatewayLink {
    async fn create_order(&self, params: SignedParams) -> Result<GatewayOrder, GatewayError>;

    async fn query_order(&self, params: SignedParams) -> Result<GatewayOrderStatus, GatewayError>;
}
