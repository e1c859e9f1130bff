//! POST /webhook: authentication, parsing and deduplication

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::*;

async fn app_with_order() -> TestApp {
    let t = test_app();
    seed_order(&t.state.ledger, "order_abc", 50000).await;
    t
}

#[tokio::test]
async fn test_valid_capture_is_acknowledged() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);

    let (status, response) =
        post_webhook(&t.app, &body, Some(&webhook_signature(&body)), Some("evt_1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));
    let order = t.state.ledger.order("order_abc").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let event = t.state.ledger.webhook_event("evt_1").await.unwrap().unwrap();
    assert_eq!(event.raw_body, body.as_bytes(), "raw bytes are stored as received");
    assert_eq!(event.payment_id.as_deref(), Some("pay_1"));
    assert_eq!(event.order_id.as_deref(), Some("order_abc"));
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);

    let (status, response) = post_webhook(&t.app, &body, None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({ "error": "Invalid signature" }));
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 0);
}

#[tokio::test]
async fn test_signature_from_key_secret_is_rejected() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);
    let wrong = sign(&SigningSecret::new(KEY_SECRET).unwrap(), body.as_bytes()).unwrap();

    let (status, _) = post_webhook(&t.app, &body, Some(&wrong), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reserialized_body_is_rejected() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);
    let signature = webhook_signature(&body);

    // Same JSON value, different bytes
    let value: Value = serde_json::from_str(&body).unwrap();
    let reformatted = serde_json::to_string_pretty(&value).unwrap();
    assert_ne!(reformatted, body);

    let (status, response) = post_webhook(&t.app, &reformatted, Some(&signature), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Invalid signature");
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 0);
    assert_eq!(count_rows(&t.db.pool, "payments"), 0);
    let order = t.state.ledger.order("order_abc").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Created);
}

#[tokio::test]
async fn test_tampered_amount_is_rejected() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);
    let signature = webhook_signature(&body);
    let tampered = body.replace("50000", "50001");

    let (status, _) = post_webhook(&t.app, &tampered, Some(&signature), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 0);
}

#[tokio::test]
async fn test_authentic_garbage_is_invalid_payload() {
    let t = app_with_order().await;
    let body = "this is not json";

    let (status, response) =
        post_webhook(&t.app, body, Some(&webhook_signature(body)), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response, json!({ "error": "Invalid payload" }));
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 0);
}

#[tokio::test]
async fn test_duplicate_delivery_with_event_id() {
    let t = app_with_order().await;
    let body = failed_body("pay_1", "order_abc", "Card declined");
    let signature = webhook_signature(&body);

    let first = post_webhook(&t.app, &body, Some(&signature), Some("evt_dup")).await;
    let snapshot = t.state.ledger.order_with_payments("order_abc").await.unwrap();
    let second = post_webhook(&t.app, &body, Some(&signature), Some("evt_dup")).await;

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(
        t.state.ledger.order_with_payments("order_abc").await.unwrap(),
        snapshot
    );
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 1);
}

#[tokio::test]
async fn test_duplicate_delivery_without_event_id_is_derived() {
    let t = app_with_order().await;
    let body = captured_body("pay_1", "order_abc", 50000);
    let signature = webhook_signature(&body);

    post_webhook(&t.app, &body, Some(&signature), None).await;
    let (status, _) = post_webhook(&t.app, &body, Some(&signature), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 1);

    let conn = t.db.pool.get().unwrap();
    let event_id: String = conn
        .query_row("SELECT event_id FROM webhook_events", [], |row| row.get(0))
        .unwrap();
    assert!(event_id.starts_with("derived_"));
}

#[tokio::test]
async fn test_failure_after_capture_is_acknowledged_but_ignored() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;
    let body = failed_body("pay_1", "order_abc", "late failure");

    let (status, _) =
        post_webhook(&t.app, &body, Some(&webhook_signature(&body)), Some("evt_late")).await;

    assert_eq!(status, StatusCode::OK);
    let order = t.state.ledger.order("order_abc").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_unhandled_event_type_is_acknowledged() {
    let t = app_with_order().await;
    let body = json!({ "event": "order.paid", "payload": {} }).to_string();

    let (status, response) =
        post_webhook(&t.app, &body, Some(&webhook_signature(&body)), Some("evt_o")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "ok");
    let order = t.state.ledger.order("order_abc").await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Created);
}

#[tokio::test]
async fn test_unknown_order_is_acknowledged() {
    let t = test_app();
    let body = captured_body("pay_1", "order_elsewhere", 100);

    let (status, _) =
        post_webhook(&t.app, &body, Some(&webhook_signature(&body)), Some("evt_u")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(count_rows(&t.db.pool, "orders"), 0);
}
