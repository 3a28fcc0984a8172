//! Plugs the WPay REST client into the engine as its [`GatewayLink`].
use log::*;
use upi_payment_engine::{
    helpers::SignedParams,
    traits::{GatewayError, GatewayLink, GatewayOrder, GatewayOrderStatus},
};
use wpay_tools::{CreateOrderData, QueryOrderData, WPayApi, WPayApiError, WPayConfig};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct WPayGateway {
    api: WPayApi,
}

impl WPayGateway {
    pub fn new(config: WPayConfig) -> Result<Self, ServerError> {
        let api = WPayApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }
}

impl GatewayLink for WPayGateway {
    async fn create_order(&self, params: SignedParams) -> Result<GatewayOrder, GatewayError> {
        let data = self.api.create_order(params.as_map()).await.map_err(to_gateway_error)?;
        Ok(gateway_order(data))
    }

    async fn query_order(&self, params: SignedParams) -> Result<GatewayOrderStatus, GatewayError> {
        let data = self.api.query_order(params.as_map()).await.map_err(to_gateway_error)?;
        Ok(gateway_order_status(data))
    }
}

fn gateway_order(data: CreateOrderData) -> GatewayOrder {
    GatewayOrder { platform_order_id: data.transaction_id, pay_url: data.upi_url, qr_payload: data.qr_code_base64 }
}

fn gateway_order_status(data: QueryOrderData) -> GatewayOrderStatus {
    if data.amount.is_some() && data.amount().is_none() {
        warn!("🌐️ Ignoring unreadable amount in gateway query reply: {:?}", data.amount);
    }
    GatewayOrderStatus {
        actual_amount: data.amount(),
        completed_at: data.completed_at(),
        platform_order_id: data.transaction_id,
        trade_status: data.trade_status,
    }
}

fn to_gateway_error(e: WPayApiError) -> GatewayError {
    match e {
        WPayApiError::Timeout => GatewayError::Timeout,
        WPayApiError::Rejected { code, message } => GatewayError::Rejected { code, message },
        WPayApiError::QueryError { status, message } => {
            GatewayError::Rejected { code: format!("HTTP {status}"), message }
        },
        WPayApiError::JsonError(s) | WPayApiError::RestResponseError(s) => GatewayError::InvalidResponse(s),
        WPayApiError::Initialization(s) | WPayApiError::RestRequestError(s) => GatewayError::Transport(s),
    }
}
