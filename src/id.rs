//! Merchant-side identifiers: order receipts, local refund ids, and derived
//! webhook event ids.
//!
//! Receipt format: `rcpt_{unix_millis}_{counter}_{8 hex}`. The counter is
//! process-wide and monotonic, so two receipts minted in the same millisecond
//! still differ; the random suffix separates processes sharing a clock tick.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use uuid::Uuid;

static RECEIPT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Width of the bucket used when deriving event ids from timestamps.
pub const EVENT_BUCKET_SECS: i64 = 300;

/// Razorpay caps receipts at 40 characters.
pub const MAX_RECEIPT_LEN: usize = 40;

pub fn new_receipt() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let counter = RECEIPT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix = &Uuid::new_v4().as_simple().to_string()[..8];
    format!("rcpt_{}_{}_{}", millis, counter, suffix)
}

pub fn new_refund_id() -> String {
    format!("rf_{}", Uuid::new_v4().as_simple())
}

/// Deterministic event id for deliveries that carry no gateway event id.
///
/// Redeliveries of the same logical event share type, payment id and
/// creation bucket, so they collapse onto the same id.
pub fn derive_event_id(event_type: &str, payment_id: Option<&str>, created_at: i64) -> String {
    let bucket = created_at.div_euclid(EVENT_BUCKET_SECS);
    let mut hasher = Sha256::new();
    hasher.update(event_type.as_bytes());
    hasher.update(b"|");
    hasher.update(payment_id.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(bucket.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("derived_{}", &digest[..32])
}
