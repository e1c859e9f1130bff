//! Refund reservations and cumulative accounting.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::common::*;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn test_unknown_payment_is_rejected() {
    let t = test_app();

    let result = t.state.refunds.refund("pay_missing", None).await;

    assert!(matches!(result, Err(AppError::UnknownPayment(_))));
    assert!(t.gateway.refund_calls().is_empty());
}

#[tokio::test]
async fn test_uncaptured_payment_is_rejected() {
    let t = test_app();
    seed_order(&t.state.ledger, "order_abc", 50000).await;
    t.state
        .ledger
        .apply_verification("order_abc", "pay_1", "sig", true)
        .await
        .unwrap();

    let result = t.state.refunds.refund("pay_1", None).await;

    assert!(matches!(result, Err(AppError::NotCaptured(_))));
    assert!(t.gateway.refund_calls().is_empty());
    assert_eq!(count_rows(&t.db.pool, "refunds"), 0);
}

#[tokio::test]
async fn test_full_refund_without_amount() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;

    let refund = t.state.refunds.refund("pay_1", None).await.unwrap();

    assert_eq!(refund.amount, 50000);
    assert_eq!(refund.status, RefundStatus::Processed);
    assert!(refund.gateway_refund_id.is_some());
    assert_eq!(t.gateway.refund_calls(), vec![("pay_1".to_string(), 50000)]);

    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Refunded);
    assert_eq!(payment.refunded_amount, 50000);
}

#[tokio::test]
async fn test_partial_refunds_accumulate() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;

    t.state.refunds.refund("pay_1", Some(dec("200"))).await.unwrap();
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 20000);
    assert_eq!(payment.status, PaymentStatus::Captured);

    t.state
        .refunds
        .refund("pay_1", Some(dec("299.99")))
        .await
        .unwrap();
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 49999);
    assert_eq!(payment.status, PaymentStatus::Captured);

    t.state.refunds.refund("pay_1", None).await.unwrap();
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 50000);
    assert_eq!(payment.status, PaymentStatus::Refunded);

    let refunds = t.state.ledger.refunds_for_payment("pay_1").await.unwrap();
    let amounts: Vec<i64> = refunds.iter().map(|r| r.amount).collect();
    assert_eq!(amounts, vec![20000, 29999, 1]);
}

#[tokio::test]
async fn test_over_refund_is_rejected() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;
    t.state.refunds.refund("pay_1", Some(dec("400"))).await.unwrap();

    let result = t.state.refunds.refund("pay_1", Some(dec("100.01"))).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(t.gateway.refund_calls().len(), 1);
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 40000);
}

#[tokio::test]
async fn test_refund_of_fully_refunded_payment_is_rejected() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;
    t.state.refunds.refund("pay_1", None).await.unwrap();

    let result = t.state.refunds.refund("pay_1", Some(dec("1"))).await;

    assert!(matches!(result, Err(AppError::NotCaptured(_))));
}

#[tokio::test]
async fn test_sub_paisa_refund_amount_is_rejected() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;

    let result = t.state.refunds.refund("pay_1", Some(dec("1.005"))).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(count_rows(&t.db.pool, "refunds"), 0);
}

#[tokio::test]
async fn test_gateway_failure_releases_reservation() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;
    t.gateway.fail_next("The refund amount provided is greater than amount captured");

    let result = t.state.refunds.refund("pay_1", Some(dec("100"))).await;

    assert!(matches!(result, Err(AppError::Gateway(_))));
    assert_eq!(count_rows(&t.db.pool, "refunds"), 0);
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 0);
    assert_eq!(payment.status, PaymentStatus::Captured);

    // the released amount is available again
    let refund = t.state.refunds.refund("pay_1", None).await.unwrap();
    assert_eq!(refund.amount, 50000);
}

#[tokio::test]
async fn test_pending_reservation_counts_against_balance() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;

    let held = t.state.ledger.reserve_refund("pay_1", Some(30000)).await.unwrap();
    assert_eq!(held.status, RefundStatus::Pending);

    let result = t.state.ledger.reserve_refund("pay_1", Some(30000)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let rest = t.state.ledger.reserve_refund("pay_1", None).await.unwrap();
    assert_eq!(rest.amount, 20000);
}

#[tokio::test]
async fn test_gateway_amount_is_booked() {
    let t = test_app();
    settle(&t.state.ledger, "order_abc", "pay_1", 50000).await;
    t.gateway.cap_next_refund(10000);

    let refund = t.state.refunds.refund("pay_1", Some(dec("200"))).await.unwrap();

    assert_eq!(refund.amount, 10000);
    assert_eq!(refund.status, RefundStatus::Processed);
    let payment = t.state.ledger.payment("pay_1").await.unwrap().unwrap();
    assert_eq!(payment.refunded_amount, 10000);
    assert_eq!(payment.status, PaymentStatus::Captured);

    let rest = t.state.refunds.refund("pay_1", None).await.unwrap();
    assert_eq!(rest.amount, 40000);
}
