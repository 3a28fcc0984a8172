use actix_web::{http::StatusCode, test::TestRequest};
use chrono::{Duration, Utc};
use upi_payment_engine::{
    db_types::OrderStatusType,
    traits::{OrderStore, OrderStoreError},
    MemoryDatabase,
};

use super::{
    helpers::{json, pending_order, send, server_config, signed_callback},
    mocks::{MockGateway, MockStore},
};

fn callback(body: Vec<u8>) -> TestRequest {
    TestRequest::post()
        .uri("/callbacks/payment")
        .insert_header(("Content-Type", "application/json"))
        .peer_addr("10.0.0.1:40000".parse().unwrap())
        .set_payload(body)
}

#[actix_web::test]
async fn paid_callback_is_acknowledged_every_time() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let body = signed_callback("UP1", "SUCCESS", Utc::now());
    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    let paid = db.fetch_order(&id).await.unwrap();
    assert_eq!(paid.status, OrderStatusType::Paid);
    assert_eq!(paid.platform_order_id.as_deref(), Some("WPUP1"));

    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    let replayed = db.fetch_order(&id).await.unwrap();
    assert_eq!(replayed.status, OrderStatusType::Paid);
    assert_eq!(replayed.last_callback_payload, paid.last_callback_payload);
}

#[actix_web::test]
async fn error_status_fails_the_order() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let body = signed_callback("UP1", "ERROR", Utc::now());
    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Failed);
}

#[actix_web::test]
async fn numeric_amount_is_accepted() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let body = String::from_utf8(signed_callback("UP1", "SUCCESS", Utc::now())).unwrap();
    let numeric = body.replace("\"amount\":\"500\"", "\"amount\":500.00");
    assert_ne!(body, numeric);
    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(numeric.into_bytes())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Paid);
}

#[actix_web::test]
async fn bad_signature_is_refused() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let body = String::from_utf8(signed_callback("UP1", "SUCCESS", Utc::now())).unwrap();
    let tampered = body.replace("\"tradeStatus\":\"SUCCESS\"", "\"tradeStatus\":\"FAILED\"");
    assert_ne!(body, tampered);
    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(tampered.into_bytes())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&text)["error"].is_string());
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn stale_and_malformed_callbacks_are_refused() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let stale = signed_callback("UP1", "SUCCESS", Utc::now() - Duration::hours(1));
    let (status, _) = send(server_config(), db.clone(), MockGateway::new(), callback(stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(server_config(), db.clone(), MockGateway::new(), callback(b"not json".to_vec())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn callback_for_another_merchant_is_refused() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    pending_order(&db, "UP1").await;
    let mut config = server_config();
    config.wpay.merchant_id = "2000".into();
    let body = signed_callback("UP1", "SUCCESS", Utc::now());
    let (status, _) = send(config, db, MockGateway::new(), callback(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn unknown_order_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let body = signed_callback("UP404", "SUCCESS", Utc::now());
    let (status, text) = send(server_config(), db.clone(), MockGateway::new(), callback(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    assert!(db.is_empty());
}

#[actix_web::test]
async fn store_failure_is_still_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Err(OrderStoreError::DatabaseError("database is locked".into())));
    store.expect_transition().never();
    let body = signed_callback("UP1", "SUCCESS", Utc::now());
    let (status, text) = send(server_config(), store, MockGateway::new(), callback(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
}

#[actix_web::test]
async fn callback_whitelist() {
    let _ = env_logger::try_init().ok();
    let db = MemoryDatabase::new();
    let id = pending_order(&db, "UP1").await;
    let mut config = server_config();
    config.callback_whitelist = Some(vec!["10.0.0.2".parse().unwrap()]);

    let body = signed_callback("UP1", "SUCCESS", Utc::now());
    let (status, _) = send(config.clone(), db.clone(), MockGateway::new(), callback(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Pending);

    let req = callback(body).peer_addr("10.0.0.2:40000".parse().unwrap());
    let (status, text) = send(config, db.clone(), MockGateway::new(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "SUCCESS");
    assert_eq!(db.fetch_order(&id).await.unwrap().status, OrderStatusType::Paid);
}
