use std::collections::BTreeMap;

use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use chrono::{DateTime, Utc};
use upi_common::{Paise, Secret};
use upi_payment_engine::{
    db_types::{NewOrder, OrderId, OrderPatch, OrderStatusType, PayType},
    helpers::{gateway_timestamp, SignatureCodec},
    traits::{GatewayLink, OrderStore},
    MemoryDatabase,
    OrderCoordinator,
};

use crate::{config::ServerConfig, server::configure_routes};

pub const SECRET: &str = "eb6080dbc8dc429ab86a1cd1c337975d";
pub const MCH_ID: &str = "1000";

pub fn server_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.public_domain = "https://pay.example.in".into();
    config.wpay.merchant_id = MCH_ID.into();
    config.wpay.secret_key = Secret::new(SECRET.to_string());
    config
}

pub fn codec() -> SignatureCodec {
    SignatureCodec::new(Secret::new(SECRET.to_string()))
}

/// Sends a single request through the full route table, using `db` and `gateway` behind the coordinator.
pub async fn send<B, G>(config: ServerConfig, db: B, gateway: G, req: TestRequest) -> (StatusCode, String)
where
    B: OrderStore + 'static,
    G: GatewayLink + 'static,
{
    let coordinator = OrderCoordinator::new(db, gateway, codec(), config.coordinator_config());
    let app = App::new()
        .app_data(web::Data::new(coordinator))
        .configure(|cfg| configure_routes::<B, G>(cfg, &config));
    let service = test::init_service(app).await;
    let (_, res) = test::call_service(&service, req.to_request()).await.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

/// Stores an order that the gateway has already accepted.
pub async fn pending_order(db: &MemoryDatabase, order_id: &str) -> OrderId {
    let id = OrderId(order_id.to_string());
    db.insert_order(NewOrder::new(id.clone(), Paise::from_rupees(500), PayType::Upi)).await.unwrap();
    db.transition(&id, &[OrderStatusType::Created], Some(OrderStatusType::Pending), OrderPatch::default())
        .await
        .unwrap();
    id
}

/// A callback body as the gateway would send it, signed with [`SECRET`].
pub fn signed_callback(order_id: &str, trade_status: &str, at: DateTime<Utc>) -> Vec<u8> {
    let params = BTreeMap::from([
        ("mchId".to_string(), MCH_ID.to_string()),
        ("outTradeNo".to_string(), order_id.to_string()),
        ("transactionId".to_string(), format!("WP{order_id}")),
        ("tradeStatus".to_string(), trade_status.to_string()),
        ("amount".to_string(), "500".to_string()),
        ("timestamp".to_string(), gateway_timestamp(at)),
    ]);
    let signed = codec().sign_params(params);
    serde_json::to_vec(signed.as_map()).unwrap()
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap()
}
