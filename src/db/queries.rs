use rusqlite::{Connection, params};

use super::from_row::{
    ORDER_COLS, PAYMENT_COLS, REFUND_COLS, WEBHOOK_EVENT_COLS, query_all, query_one,
};
use crate::error::Result;
use crate::models::*;

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============ Orders ============

pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    let now = now();

    conn.execute(
        "INSERT INTO orders (id, amount, currency, receipt, status, superseded_by, retry_of, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'created', NULL, ?5, ?6, ?6)",
        params![
            &input.id,
            input.amount,
            &input.currency,
            &input.receipt,
            &input.retry_of,
            now
        ],
    )?;

    Ok(Order {
        id: input.id.clone(),
        amount: input.amount,
        currency: input.currency.clone(),
        receipt: input.receipt.clone(),
        status: OrderStatus::Created,
        superseded_by: None,
        retry_of: input.retry_of.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_order(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        &[&id],
    )
}

/// Compare-and-set an order's status.
///
/// Returns `Ok(false)` if the order was no longer in `from` (another writer won).
pub fn update_order_status(
    conn: &Connection,
    id: &str,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now(), id, from.as_str()],
    )?;
    Ok(affected > 0)
}

/// Link a successor order. Only the first link sticks.
pub fn set_order_superseded_by(conn: &Connection, id: &str, successor_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET superseded_by = ?1, updated_at = ?2 WHERE id = ?3 AND superseded_by IS NULL",
        params![successor_id, now(), id],
    )?;
    Ok(affected > 0)
}

// ============ Payments ============

pub fn get_payment(conn: &Connection, id: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLS),
        &[&id],
    )
}

pub fn list_payments_for_order(conn: &Connection, order_id: &str) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE order_id = ?1 ORDER BY created_at, rowid",
            PAYMENT_COLS
        ),
        &[&order_id],
    )
}

/// Get a payment, inserting a `pending` row for `order_id` if none exists.
pub fn get_or_create_payment(conn: &Connection, id: &str, order_id: &str) -> Result<Payment> {
    let now = now();
    conn.execute(
        "INSERT OR IGNORE INTO payments (id, order_id, verified, capture_confirmed, status, refunded_amount, created_at, updated_at)
         VALUES (?1, ?2, 0, 0, 'pending', 0, ?3, ?3)",
        params![id, order_id, now],
    )?;
    get_payment(conn, id)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
}

/// Move a provisional payment to another order. Only a rejected, unverified,
/// unconfirmed row still bound to `from_order` is moved.
pub fn rebind_provisional_payment(
    conn: &Connection,
    id: &str,
    from_order: &str,
    to_order: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE payments SET order_id = ?1, updated_at = ?2
         WHERE id = ?3 AND order_id = ?4 AND status = 'rejected'
           AND verified = 0 AND capture_confirmed = 0",
        params![to_order, now(), id, from_order],
    )?;
    Ok(affected > 0)
}

/// Write back a payment's mutable fields if its status is still `expected`.
///
/// Returns `Ok(false)` when the stored status changed underneath the caller.
pub fn save_payment(conn: &Connection, payment: &Payment, expected: PaymentStatus) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE payments SET
            signature_presented = ?1,
            verified = ?2,
            capture_confirmed = ?3,
            status = ?4,
            amount = ?5,
            currency = ?6,
            refunded_amount = ?7,
            failure_reason = ?8,
            updated_at = ?9
         WHERE id = ?10 AND status = ?11",
        params![
            &payment.signature_presented,
            payment.verified as i32,
            payment.capture_confirmed as i32,
            payment.status.as_str(),
            payment.amount,
            &payment.currency,
            payment.refunded_amount,
            &payment.failure_reason,
            now(),
            &payment.id,
            expected.as_str(),
        ],
    )?;
    Ok(affected > 0)
}

// ============ Refunds ============

pub fn create_refund(conn: &Connection, refund: &Refund) -> Result<()> {
    conn.execute(
        "INSERT INTO refunds (id, gateway_refund_id, payment_id, amount, currency, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &refund.id,
            &refund.gateway_refund_id,
            &refund.payment_id,
            refund.amount,
            &refund.currency,
            refund.status.as_str(),
            refund.created_at,
            refund.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_refund(conn: &Connection, id: &str) -> Result<Option<Refund>> {
    query_one(
        conn,
        &format!("SELECT {} FROM refunds WHERE id = ?1", REFUND_COLS),
        &[&id],
    )
}

pub fn list_refunds_for_payment(conn: &Connection, payment_id: &str) -> Result<Vec<Refund>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM refunds WHERE payment_id = ?1 ORDER BY created_at, rowid",
            REFUND_COLS
        ),
        &[&payment_id],
    )
}

/// Sum of refunds reserved but not yet confirmed by the gateway.
pub fn pending_refund_total(conn: &Connection, payment_id: &str) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM refunds WHERE payment_id = ?1 AND status = 'pending'",
        params![payment_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

/// Flip a pending refund to processed. Returns `Ok(false)` if it was not pending.
pub fn mark_refund_processed(
    conn: &Connection,
    id: &str,
    gateway_refund_id: &str,
    amount: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE refunds SET status = 'processed', gateway_refund_id = ?1, amount = ?2, updated_at = ?3
         WHERE id = ?4 AND status = 'pending'",
        params![gateway_refund_id, amount, now(), id],
    )?;
    Ok(affected > 0)
}

/// Release a reservation after the gateway refused the refund.
pub fn delete_pending_refund(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM refunds WHERE id = ?1 AND status = 'pending'",
        params![id],
    )?;
    Ok(affected > 0)
}

// ============ Webhook Event Deduplication ============

/// Record a delivery, returning true if this event id was not seen before.
///
/// Uses INSERT OR IGNORE so concurrent deliveries of the same event agree
/// on a single row.
pub fn try_record_webhook_event(conn: &Connection, record: &WebhookEventRecord) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (event_id, event_type, payment_id, order_id, raw_body, processed, received_at, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, NULL)",
        params![
            &record.event_id,
            &record.event_type,
            &record.payment_id,
            &record.order_id,
            &record.raw_body,
            record.received_at,
        ],
    )?;
    Ok(affected > 0)
}

pub fn get_webhook_event(conn: &Connection, event_id: &str) -> Result<Option<WebhookEventRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM webhook_events WHERE event_id = ?1",
            WEBHOOK_EVENT_COLS
        ),
        &[&event_id],
    )
}

/// Atomically claim an unprocessed event. Returns false if it was already processed.
pub fn try_mark_webhook_event_processed(conn: &Connection, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE webhook_events SET processed = 1, processed_at = ?1 WHERE event_id = ?2 AND processed = 0",
        params![now(), event_id],
    )?;
    Ok(affected > 0)
}

/// Purge processed webhook events beyond the retention period.
/// Unprocessed events are kept so redeliveries can still be matched.
pub fn purge_processed_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now().saturating_sub(retention_days.saturating_mul(86400));
    let deleted = conn.execute(
        "DELETE FROM webhook_events WHERE processed = 1 AND processed_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
