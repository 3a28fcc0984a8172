use std::sync::{Arc, Mutex};

use upi_payment_engine::{
    helpers::SignedParams,
    traits::{GatewayError, GatewayLink, GatewayOrder, GatewayOrderStatus},
};

/// A scripted gateway. It accepts every order unless told to fail, and records every request it receives.
#[derive(Clone, Default)]
pub struct FakeGateway {
    create_failure: Arc<Mutex<Option<GatewayError>>>,
    query_response: Arc<Mutex<Option<Result<GatewayOrderStatus, GatewayError>>>>,
    requests: Arc<Mutex<Vec<SignedParams>>>,
}

impl FakeGateway {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn failing_with(e: GatewayError) -> Self {
        let gateway = Self::default();
        *gateway.create_failure.lock().unwrap() = Some(e);
        gateway
    }

    pub fn answer_queries_with(&self, response: Result<GatewayOrderStatus, GatewayError>) {
        *self.query_response.lock().unwrap() = Some(response);
    }

    pub fn requests(&self) -> Vec<SignedParams> {
        self.requests.lock().unwrap().clone()
    }
}

impl GatewayLink for FakeGateway {
    async fn create_order(&self, params: SignedParams) -> Result<GatewayOrder, GatewayError> {
        let order_id = params.get("outTradeNo").unwrap_or_default().to_string();
        self.requests.lock().unwrap().push(params);
        if let Some(e) = self.create_failure.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(GatewayOrder {
            platform_order_id: Some(format!("WP{order_id}")),
            pay_url: format!("upi://pay?pa=merchant@bank&tr={order_id}"),
            qr_payload: Some("iVBORw0KGgo=".to_string()),
        })
    }

    async fn query_order(&self, params: SignedParams) -> Result<GatewayOrderStatus, GatewayError> {
        self.requests.lock().unwrap().push(params);
        self.query_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(GatewayError::Transport("no scripted answer".into())))
    }
}
