//! Full payment lifecycles through the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_order_verify_capture_flow() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_abc"]));

    let (status, body) = post_json(
        &t.app,
        "/create-order",
        json!({ "amount": 500, "currency": "INR" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], "order_abc");
    assert_eq!(body["order"]["amount"], 50000);

    let (status, body) = post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_abc",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": callback_signature("order_abc", "pay_1"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let (_, body) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(body["order"]["status"], "attempted");
    assert_eq!(body["payments"][0]["status"], "verified");

    let event = captured_body("pay_1", "order_abc", 50000);
    let (status, _) =
        post_webhook(&t.app, &event, Some(&webhook_signature(&event)), Some("evt_1")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["payments"][0]["status"], "captured");
    assert_eq!(body["payments"][0]["verified"], true);
    assert_eq!(body["payments"][0]["capture_confirmed"], true);
    assert_eq!(body["payments"][0]["amount"], 50000);
}

#[tokio::test]
async fn test_webhook_before_client_verification() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_abc"]));
    post_json(&t.app, "/create-order", json!({ "amount": 500 })).await;

    let event = captured_body("pay_1", "order_abc", 50000);
    post_webhook(&t.app, &event, Some(&webhook_signature(&event)), Some("evt_1")).await;

    let (_, body) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["payments"][0]["status"], "pending");

    post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_abc",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": callback_signature("order_abc", "pay_1"),
        }),
    )
    .await;

    let (_, body) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(body["payments"][0]["status"], "captured");
}

#[tokio::test]
async fn test_tampered_webhook_leaves_ledger_untouched() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_abc"]));
    post_json(&t.app, "/create-order", json!({ "amount": 500 })).await;
    let (_, before) = get_json(&t.app, "/payment-status/order_abc").await;

    let event = captured_body("pay_1", "order_abc", 50000);
    let signature = webhook_signature(&event);
    let tampered = event.replace("order_abc", "order_abd");

    let (status, _) = post_webhook(&t.app, &tampered, Some(&signature), Some("evt_1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, after) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(before, after);
    assert_eq!(count_rows(&t.db.pool, "webhook_events"), 0);
}

#[tokio::test]
async fn test_forged_callback_for_other_order_does_not_block_settlement() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_real", "order_other"]));
    post_json(&t.app, "/create-order", json!({ "amount": 500 })).await;
    post_json(&t.app, "/create-order", json!({ "amount": 500 })).await;

    let (status, body) = post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_other",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": "deadbeef",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], false);

    let (status, body) = post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_real",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": callback_signature("order_real", "pay_1"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let event = captured_body("pay_1", "order_real", 50000);
    let (status, _) =
        post_webhook(&t.app, &event, Some(&webhook_signature(&event)), Some("evt_1")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get_json(&t.app, "/payment-status/order_real").await;
    assert_eq!(body["order"]["status"], "paid");
    assert_eq!(body["payments"][0]["status"], "captured");

    let (_, other) = get_json(&t.app, "/payment-status/order_other").await;
    assert_eq!(other["order"]["status"], "created");
    assert_eq!(other["payments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_failed_payment_retry_then_capture() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_1", "order_2"]));
    post_json(&t.app, "/create-order", json!({ "amount": 99.5 })).await;

    let failed = failed_body("pay_1", "order_1", "Payment declined by bank");
    post_webhook(&t.app, &failed, Some(&webhook_signature(&failed)), Some("evt_f")).await;

    let (status, body) =
        post_json(&t.app, "/retry-payment", json!({ "orderId": "order_1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newOrder"]["id"], "order_2");
    assert_eq!(body["newOrder"]["amount"], 9950);

    post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_2",
            "razorpay_payment_id": "pay_2",
            "razorpay_signature": callback_signature("order_2", "pay_2"),
        }),
    )
    .await;
    let captured = captured_body("pay_2", "order_2", 9950);
    post_webhook(&t.app, &captured, Some(&webhook_signature(&captured)), Some("evt_c")).await;

    let (_, first) = get_json(&t.app, "/payment-status/order_1").await;
    assert_eq!(first["order"]["status"], "failed");
    assert_eq!(first["order"]["superseded_by"], "order_2");
    assert_eq!(first["payments"][0]["failure_reason"], "Payment declined by bank");

    let (_, second) = get_json(&t.app, "/payment-status/order_2").await;
    assert_eq!(second["order"]["status"], "paid");
    assert_eq!(second["order"]["retry_of"], "order_1");
}

#[tokio::test]
async fn test_capture_then_partial_and_final_refund() {
    let t = test_app_with(FakeGateway::with_order_ids(&["order_abc"]));
    post_json(&t.app, "/create-order", json!({ "amount": 500 })).await;
    post_json(
        &t.app,
        "/verify-payment",
        json!({
            "razorpay_order_id": "order_abc",
            "razorpay_payment_id": "pay_1",
            "razorpay_signature": callback_signature("order_abc", "pay_1"),
        }),
    )
    .await;
    let event = captured_body("pay_1", "order_abc", 50000);
    post_webhook(&t.app, &event, Some(&webhook_signature(&event)), Some("evt_1")).await;

    let (status, _) = post_json(
        &t.app,
        "/refund-payment",
        json!({ "paymentId": "pay_1", "amount": 100 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &t.app,
        "/refund-payment",
        json!({ "paymentId": "pay_1", "amount": 401 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "validation_error");

    let (status, body) =
        post_json(&t.app, "/refund-payment", json!({ "paymentId": "pay_1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refund"]["amount"], 40000);

    let (_, body) = get_json(&t.app, "/payment-status/order_abc").await;
    assert_eq!(body["payments"][0]["status"], "refunded");
    assert_eq!(body["payments"][0]["refunded_amount"], 50000);
    assert_eq!(body["order"]["status"], "paid");
}

#[tokio::test]
async fn test_health() {
    let t = test_app();

    let (status, body) = get_json(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
