use actix_web::{
    http::{header::ContentType, StatusCode},
    test::TestRequest,
};
use serde_json::json;
use upi_common::Paise;
use upi_payment_engine::{
    db_types::{OrderId, OrderStatusType},
    traits::{GatewayError, GatewayOrder, GatewayOrderStatus, OrderStore, OrderStoreError},
    MemoryDatabase,
};

use super::{
    helpers::{json, pending_order, send, server_config},
    mocks::{MockGateway, MockStore},
};

fn accepting_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().times(1).returning(|params| {
        let order_id = params.get("outTradeNo").unwrap_or_default().to_string();
        Ok(GatewayOrder {
            platform_order_id: Some(format!("WP{order_id}")),
            pay_url: format!("upi://pay?pa=merchant@bank&tr={order_id}"),
            qr_payload: Some("iVBORw0KGgo=".into()),
        })
    });
    gateway
}

fn idle_gateway() -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    gateway.expect_query_order().never();
    gateway
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let req = TestRequest::post().uri("/orders").set_json(json!({"amount": "500", "payType": "UPI"}));
    let (status, body) = send(server_config(), db.clone(), accepting_gateway(), req).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = json(&body);
    let order_id = body["orderId"].as_str().unwrap();
    assert!(order_id.starts_with("UP"));
    assert_eq!(body["payUrl"], format!("upi://pay?pa=merchant@bank&tr={order_id}"));
    assert_eq!(body["qrPayload"], "iVBORw0KGgo=");
    let order = db.fetch_order(&OrderId(order_id.into())).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.amount, Paise::from_rupees(500));
}

#[actix_web::test]
async fn create_order_with_numeric_amount_and_metadata() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let req = TestRequest::post().uri("/orders").set_json(json!({"amount": 99.5, "metadata": {"cart": "A17"}}));
    let (status, body) = send(server_config(), db.clone(), accepting_gateway(), req).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = OrderId(json(&body)["orderId"].as_str().unwrap().into());
    let order = db.fetch_order(&order_id).await.unwrap();
    assert_eq!(order.amount, Paise::from(9_950));
    assert_eq!(order.metadata.as_deref(), Some(r#"{"cart":"A17"}"#));
}

#[actix_web::test]
async fn create_order_rejects_bad_amounts() {
    let _ = env_logger::try_init().ok();
    for amount in [json!("abc"), json!("0"), json!("1.234"), json!(-5)] {
        let db = MemoryDatabase::new();
        let req = TestRequest::post().uri("/orders").set_json(json!({ "amount": amount }));
        let (status, body) = send(server_config(), db.clone(), idle_gateway(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
        assert!(json(&body)["error"].is_string());
        assert!(db.is_empty());
    }
}

#[actix_web::test]
async fn create_order_rejects_malformed_json() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").insert_header(ContentType::json()).set_payload("{\"amount\": ");
    let (status, body) = send(server_config(), MemoryDatabase::new(), idle_gateway(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn create_order_gateway_refusal() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .returning(|_| Err(GatewayError::Rejected { code: "FAIL".into(), message: "merchant disabled".into() }));
    let db = MemoryDatabase::new();
    let req = TestRequest::post().uri("/orders").set_json(json!({"amount": "500"}));
    let (status, body) = send(server_config(), db.clone(), gateway, req).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json(&body)["error"].as_str().unwrap().contains("merchant disabled"));
    assert!(db.is_empty());
}

#[actix_web::test]
async fn create_order_gateway_timeout() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().returning(|_| Err(GatewayError::Timeout));
    let db = MemoryDatabase::new();
    let req = TestRequest::post().uri("/orders").set_json(json!({"amount": "500"}));
    let (status, body) = send(server_config(), db.clone(), gateway, req).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json(&body)["orderId"].as_str().unwrap().starts_with("UP"));
    assert!(db.is_empty());
}

#[actix_web::test]
async fn order_status() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    pending_order(&db, "UP1").await;
    let req = TestRequest::get().uri("/orders/UP1");
    let (status, body) = send(server_config(), db.clone(), idle_gateway(), req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["orderId"], "UP1");
    assert_eq!(body["status"], "PENDING");
    assert!(body["createdAt"].is_string());

    let req = TestRequest::get().uri("/orders/UP2");
    let (status, body) = send(server_config(), db, idle_gateway(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "Order UP2 does not exist");
}

#[actix_web::test]
async fn order_status_store_failure() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Err(OrderStoreError::DatabaseError("disk I/O error".into())));
    let req = TestRequest::get().uri("/orders/UP1");
    let (status, _) = send(server_config(), store, idle_gateway(), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn reconcile_records_utr() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let req = TestRequest::post().uri("/orders/UP1/reconcile").set_json(json!({"utr": "123456789012"}));
    let (status, body) = send(server_config(), db.clone(), idle_gateway(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"status": "PENDING"}));
    let order = db.fetch_order(&id).await.unwrap();
    assert_eq!(order.utr.as_deref(), Some("123456789012"));
    assert_eq!(order.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn reconcile_without_body() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    pending_order(&db, "UP1").await;
    let req = TestRequest::post().uri("/orders/UP1/reconcile");
    let (status, body) = send(server_config(), db, idle_gateway(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"status": "PENDING"}));
}

#[actix_web::test]
async fn reconcile_rejects_bad_utr() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let req = TestRequest::post().uri("/orders/UP1/reconcile").set_json(json!({"utr": "12345ABC"}));
    let (status, _) = send(server_config(), db.clone(), idle_gateway(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(db.fetch_order(&id).await.unwrap().utr.is_none());

    let req = TestRequest::post().uri("/orders/UP9/reconcile").set_json(json!({"utr": "123456789012"}));
    let (status, _) = send(server_config(), db, idle_gateway(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn refresh_applies_gateway_status() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_order().times(1).returning(|_| {
        Ok(GatewayOrderStatus {
            trade_status: "SUCCESS".into(),
            actual_amount: Some(Paise::from_rupees(500)),
            platform_order_id: Some("WPUP1".into()),
            completed_at: None,
        })
    });
    let req = TestRequest::post().uri("/orders/UP1/query");
    let (status, body) = send(server_config(), db.clone(), gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"orderId": "UP1", "status": "PAID", "refreshed": true}));
    let order = db.fetch_order(&id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    assert!(order.completed_at.is_some());
}

#[actix_web::test]
async fn refresh_reports_unreachable_gateway() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    pending_order(&db, "UP1").await;
    let mut gateway = MockGateway::new();
    gateway.expect_query_order().returning(|_| Err(GatewayError::Transport("connection refused".into())));
    let req = TestRequest::post().uri("/orders/UP1/query");
    let (status, body) = send(server_config(), db, gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["refreshed"], false);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}
