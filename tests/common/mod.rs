//! Test utilities and fixtures for payrelay integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub use payrelay::db::{AppState, DbPool, create_pool, init_db, queries};
pub use payrelay::error::AppError;
pub use payrelay::gateway::{
    GatewayOrder, GatewayOrderStatus, GatewayRefund, NewGatewayOrder, PaymentGateway,
};
pub use payrelay::handlers;
pub use payrelay::ledger::{DeliveryState, EventOutcome, Ledger};
pub use payrelay::models::*;
pub use payrelay::signature::{SignatureKeys, SigningSecret, callback_message, sign};

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

// ============ Database ============

/// A file-backed ledger in a temporary directory. Pooled connections must
/// share one database, which in-memory SQLite cannot do.
pub struct TestDb {
    pub pool: DbPool,
    _dir: TempDir,
}

pub fn setup_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("ledger.db");
    let pool = create_pool(path.to_str().unwrap()).expect("Failed to create pool");
    {
        let conn = pool.get().unwrap();
        init_db(&conn).expect("Failed to initialize schema");
    }
    TestDb { pool, _dir: dir }
}

pub fn count_rows(pool: &DbPool, table: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })
    .unwrap()
}

// ============ Fake gateway ============

/// In-process gateway that echoes requests and records what it was asked.
#[derive(Default)]
pub struct FakeGateway {
    orders: Mutex<HashMap<String, GatewayOrder>>,
    next_ids: Mutex<VecDeque<String>>,
    counter: AtomicU64,
    fail_next: Mutex<Option<String>>,
    refund_cap: Mutex<Option<i64>>,
    pub created: Mutex<Vec<NewGatewayOrder>>,
    pub refunds: Mutex<Vec<(String, i64)>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out these order ids first, then `order_test_N`.
    pub fn with_order_ids(ids: &[&str]) -> Self {
        let gateway = Self::new();
        gateway
            .next_ids
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| id.to_string()));
        gateway
    }

    pub fn set_status(&self, order_id: &str, status: GatewayOrderStatus) {
        if let Some(order) = self.orders.lock().unwrap().get_mut(order_id) {
            order.status = status;
        }
    }

    /// Make the next call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    /// Refund at most `amount` on the next refund call, whatever was asked.
    pub fn cap_next_refund(&self, amount: i64) {
        *self.refund_cap.lock().unwrap() = Some(amount);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn refund_calls(&self) -> Vec<(String, i64)> {
        self.refunds.lock().unwrap().clone()
    }

    fn take_failure(&self) -> payrelay::error::Result<()> {
        match self.fail_next.lock().unwrap().take() {
            Some(message) => Err(AppError::Gateway(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, order: &NewGatewayOrder) -> payrelay::error::Result<GatewayOrder> {
        self.take_failure()?;
        self.created.lock().unwrap().push(order.clone());

        let id = self.next_ids.lock().unwrap().pop_front().unwrap_or_else(|| {
            format!("order_test_{}", self.counter.fetch_add(1, Ordering::SeqCst))
        });
        let created = GatewayOrder {
            id: id.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            receipt: Some(order.receipt.clone()),
            status: GatewayOrderStatus::Created,
        };
        self.orders.lock().unwrap().insert(id, created.clone());
        Ok(created)
    }

    async fn fetch_order(&self, order_id: &str) -> payrelay::error::Result<GatewayOrder> {
        self.take_failure()?;
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| AppError::Gateway("The id provided does not exist".into()))
    }

    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: i64,
    ) -> payrelay::error::Result<GatewayRefund> {
        self.take_failure()?;
        let amount = match self.refund_cap.lock().unwrap().take() {
            Some(cap) => amount.min(cap),
            None => amount,
        };
        let mut refunds = self.refunds.lock().unwrap();
        refunds.push((payment_id.to_string(), amount));
        Ok(GatewayRefund {
            id: format!("rfnd_test_{}", refunds.len()),
            payment_id: payment_id.to_string(),
            amount,
            currency: Some("INR".into()),
            status: Some("processed".into()),
        })
    }
}

// ============ App ============

pub fn test_keys() -> SignatureKeys {
    SignatureKeys::new(
        SigningSecret::new(KEY_SECRET).unwrap(),
        SigningSecret::new(WEBHOOK_SECRET).unwrap(),
    )
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub db: TestDb,
}

pub fn test_app() -> TestApp {
    test_app_with(FakeGateway::new())
}

pub fn test_app_with(gateway: FakeGateway) -> TestApp {
    let db = setup_test_db();
    let gateway = Arc::new(gateway);
    let state = AppState::new(
        db.pool.clone(),
        gateway.clone(),
        test_keys(),
        "INR".to_string(),
    );
    let app = handlers::router().with_state(state.clone());

    TestApp {
        app,
        state,
        gateway,
        db,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post_raw(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn post_webhook(
    app: &Router,
    body: &str,
    signature: Option<&str>,
    event_id: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-razorpay-signature", signature);
    }
    if let Some(event_id) = event_id {
        builder = builder.header("x-razorpay-event-id", event_id);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

// ============ Signatures and payloads ============

pub fn callback_signature(order_id: &str, payment_id: &str) -> String {
    let secret = SigningSecret::new(KEY_SECRET).unwrap();
    sign(&secret, callback_message(order_id, payment_id).as_bytes()).unwrap()
}

pub fn webhook_signature(body: &str) -> String {
    let secret = SigningSecret::new(WEBHOOK_SECRET).unwrap();
    sign(&secret, body.as_bytes()).unwrap()
}

pub fn captured_body(payment_id: &str, order_id: &str, amount: i64) -> String {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "created_at": 1_700_000_000,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": "captured"
                }
            }
        }
    })
    .to_string()
}

pub fn failed_body(payment_id: &str, order_id: &str, reason: &str) -> String {
    json!({
        "entity": "event",
        "event": "payment.failed",
        "created_at": 1_700_000_100,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "status": "failed",
                    "error_description": reason
                }
            }
        }
    })
    .to_string()
}

// ============ Ledger fixtures ============

pub fn captured_event(payment_id: &str, order_id: &str, amount: Option<i64>) -> GatewayEvent {
    GatewayEvent::Captured(PaymentEventData {
        payment_id: payment_id.to_string(),
        order_id: Some(order_id.to_string()),
        amount,
        currency: amount.map(|_| "INR".to_string()),
        error_description: None,
    })
}

pub fn failed_event(payment_id: &str, order_id: &str, reason: &str) -> GatewayEvent {
    GatewayEvent::Failed(PaymentEventData {
        payment_id: payment_id.to_string(),
        order_id: Some(order_id.to_string()),
        amount: None,
        currency: None,
        error_description: Some(reason.to_string()),
    })
}

pub async fn seed_order(ledger: &Ledger, order_id: &str, amount: i64) -> Order {
    ledger
        .record_order(CreateOrder {
            id: order_id.to_string(),
            amount,
            currency: "INR".to_string(),
            receipt: payrelay::id::new_receipt(),
            retry_of: None,
        })
        .await
        .expect("Failed to seed order")
}

/// Record a delivery and apply it, the way the webhook processor does.
pub async fn deliver(
    ledger: &Ledger,
    event_id: &str,
    event: GatewayEvent,
) -> payrelay::error::Result<EventOutcome> {
    let payment = event.payment();
    let record = WebhookEventRecord {
        event_id: event_id.to_string(),
        event_type: event.event_type().to_string(),
        payment_id: payment.map(|p| p.payment_id.clone()),
        order_id: payment.and_then(|p| p.order_id.clone()),
        raw_body: b"{}".to_vec(),
        processed: false,
        received_at: queries::now(),
        processed_at: None,
    };
    ledger.record_delivery(record).await?;
    ledger.apply_event(event_id, event).await
}

/// Seed an order and drive one payment on it all the way to `captured`.
pub async fn settle(ledger: &Ledger, order_id: &str, payment_id: &str, amount: i64) -> Payment {
    seed_order(ledger, order_id, amount).await;
    let outcome = ledger
        .apply_verification(order_id, payment_id, "sig", true)
        .await
        .unwrap();
    assert!(outcome.verified);
    deliver(
        ledger,
        &format!("evt_capture_{}", payment_id),
        captured_event(payment_id, order_id, Some(amount)),
    )
    .await
    .unwrap();

    let payment = ledger.payment(payment_id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Captured);
    payment
}
