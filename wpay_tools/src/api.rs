use std::{collections::BTreeMap, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::de::DeserializeOwned;

use crate::{
    config::WPayConfig,
    data_objects::{CreateOrderData, QueryOrderData, WPayResponse},
    WPayApiError,
};

const CREATE_ORDER_PATH: &str = "/pay/createOrder";
const QUERY_ORDER_PATH: &str = "/pay/queryOrder";

#[derive(Clone)]
pub struct WPayApi {
    config: WPayConfig,
    client: Arc<Client>,
}

impl WPayApi {
    pub fn new(config: WPayConfig) -> Result<Self, WPayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| WPayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &WPayConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.host)
    }

    /// Posts a signed parameter set as JSON and unwraps the gateway's `{code, message, data}` envelope.
    pub async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<T, WPayApiError> {
        let url = self.url(path);
        trace!("🌐️ Sending request to {url}");
        let response = self.client.post(url).json(params).send().await.map_err(|e| {
            if e.is_timeout() {
                WPayApiError::Timeout
            } else {
                WPayApiError::RestRequestError(e.to_string())
            }
        })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| WPayApiError::RestResponseError(e.to_string()))?;
            return Err(WPayApiError::QueryError { status, message });
        }
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                WPayApiError::Timeout
            } else {
                WPayApiError::RestResponseError(e.to_string())
            }
        })?;
        let reply = serde_json::from_slice::<WPayResponse<T>>(&body).map_err(|e| WPayApiError::JsonError(e.to_string()))?;
        if !reply.is_success() {
            let message = reply.message.unwrap_or_default();
            debug!("🌐️ Gateway declined request to {path}. [{}] {message}", reply.code);
            return Err(WPayApiError::Rejected { code: reply.code, message });
        }
        reply.data.ok_or_else(|| WPayApiError::RestResponseError("The reply carried no data".into()))
    }

    pub async fn create_order(&self, params: &BTreeMap<String, String>) -> Result<CreateOrderData, WPayApiError> {
        let order_id = params.get("outTradeNo").cloned().unwrap_or_default();
        debug!("🌐️ Creating order {order_id} at the gateway");
        let data = self.post_signed::<CreateOrderData>(CREATE_ORDER_PATH, params).await?;
        info!("🌐️ Gateway accepted order {order_id}");
        Ok(data)
    }

    pub async fn query_order(&self, params: &BTreeMap<String, String>) -> Result<QueryOrderData, WPayApiError> {
        let order_id = params.get("outTradeNo").cloned().unwrap_or_default();
        debug!("🌐️ Querying order {order_id} at the gateway");
        let data = self.post_signed::<QueryOrderData>(QUERY_ORDER_PATH, params).await?;
        debug!("🌐️ Gateway reports order {order_id} as {}", data.trade_status);
        Ok(data)
    }
}
