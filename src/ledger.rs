//! The order ledger: the only shared mutable state in the system.
//!
//! Every read-then-write transition runs inside a `BEGIN IMMEDIATE`
//! transaction, so SQLite hands out the write lock before the read and
//! concurrent deliveries for the same order serialize. Writes are additionally
//! compare-and-set on the status that was read; a failed CAS aborts the
//! transaction instead of overwriting.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::{DbPool, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::id::new_refund_id;
use crate::models::*;

/// Result of applying a client-reported completion.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub verified: bool,
    pub payment: Option<Payment>,
}

/// What a webhook delivery did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Applied {
        order_id: String,
        order_status: OrderStatus,
        payment_status: PaymentStatus,
    },
    /// Authenticated and processed, but nothing could legally change
    Ignored(&'static str),
    /// Event type the ledger does not track
    Acknowledged,
    /// Already processed earlier
    Duplicate,
}

/// State of a delivery after it has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    New,
    /// Seen before but never successfully applied
    Redelivered,
    AlreadyProcessed,
}

#[derive(Clone)]
pub struct Ledger {
    pool: DbPool,
}

impl Ledger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run blocking ledger work on the blocking thread pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Ledger task failed: {}", e)))?
    }

    // ============ Orders ============

    pub async fn record_order(&self, input: CreateOrder) -> Result<Order> {
        self.run(move |conn| queries::create_order(conn, &input)).await
    }

    pub async fn order(&self, order_id: &str) -> Result<Option<Order>> {
        let order_id = order_id.to_string();
        self.run(move |conn| queries::get_order(conn, &order_id)).await
    }

    pub async fn order_with_payments(&self, order_id: &str) -> Result<Option<(Order, Vec<Payment>)>> {
        let order_id = order_id.to_string();
        self.run(move |conn| {
            let Some(order) = queries::get_order(conn, &order_id)? else {
                return Ok(None);
            };
            let payments = queries::list_payments_for_order(conn, &order_id)?;
            Ok(Some((order, payments)))
        })
        .await
    }

    /// Link `successor_id` as the replacement of `original_id`.
    /// Returns false if the original already had a successor.
    pub async fn link_successor(&self, original_id: &str, successor_id: &str) -> Result<bool> {
        let original_id = original_id.to_string();
        let successor_id = successor_id.to_string();
        self.run(move |conn| queries::set_order_superseded_by(conn, &original_id, &successor_id))
            .await
    }

    // ============ Payments ============

    pub async fn payment(&self, payment_id: &str) -> Result<Option<Payment>> {
        let payment_id = payment_id.to_string();
        self.run(move |conn| queries::get_payment(conn, &payment_id)).await
    }

    pub async fn apply_verification(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
        matched: bool,
    ) -> Result<VerificationOutcome> {
        let order_id = order_id.to_string();
        let payment_id = payment_id.to_string();
        let signature = signature.to_string();
        self.run(move |conn| {
            immediate(conn, |tx| {
                apply_verification(tx, &order_id, &payment_id, &signature, matched)
            })
        })
        .await
    }

    // ============ Webhooks ============

    pub async fn record_delivery(&self, record: WebhookEventRecord) -> Result<DeliveryState> {
        self.run(move |conn| {
            if queries::try_record_webhook_event(conn, &record)? {
                return Ok(DeliveryState::New);
            }
            match queries::get_webhook_event(conn, &record.event_id)? {
                Some(existing) if existing.processed => Ok(DeliveryState::AlreadyProcessed),
                _ => Ok(DeliveryState::Redelivered),
            }
        })
        .await
    }

    /// Apply an event and mark it processed in the same transaction.
    pub async fn apply_event(&self, event_id: &str, event: GatewayEvent) -> Result<EventOutcome> {
        let event_id = event_id.to_string();
        self.run(move |conn| immediate(conn, |tx| apply_event(tx, &event_id, &event)))
            .await
    }

    pub async fn webhook_event(&self, event_id: &str) -> Result<Option<WebhookEventRecord>> {
        let event_id = event_id.to_string();
        self.run(move |conn| queries::get_webhook_event(conn, &event_id)).await
    }

    pub async fn purge_processed_events(&self, retention_days: i64) -> Result<usize> {
        self.run(move |conn| queries::purge_processed_webhook_events(conn, retention_days))
            .await
    }

    // ============ Refunds ============

    /// Reserve `amount` (or the whole refundable balance) against a captured payment.
    pub async fn reserve_refund(&self, payment_id: &str, amount: Option<i64>) -> Result<Refund> {
        let payment_id = payment_id.to_string();
        self.run(move |conn| immediate(conn, |tx| reserve_refund(tx, &payment_id, amount)))
            .await
    }

    /// Confirm a reservation after the gateway accepted the refund, booking
    /// the amount the gateway reports rather than the amount reserved.
    pub async fn complete_refund(
        &self,
        refund_id: &str,
        gateway_refund_id: &str,
        refunded: i64,
    ) -> Result<(Refund, Payment)> {
        let refund_id = refund_id.to_string();
        let gateway_refund_id = gateway_refund_id.to_string();
        self.run(move |conn| {
            immediate(conn, |tx| {
                complete_refund(tx, &refund_id, &gateway_refund_id, refunded)
            })
        })
        .await
    }

    /// Drop a reservation after the gateway refused the refund.
    pub async fn release_refund(&self, refund_id: &str) -> Result<()> {
        let refund_id = refund_id.to_string();
        self.run(move |conn| {
            if !queries::delete_pending_refund(conn, &refund_id)? {
                tracing::warn!("Refund reservation {} was not pending on release", refund_id);
            }
            Ok(())
        })
        .await
    }

    pub async fn refunds_for_payment(&self, payment_id: &str) -> Result<Vec<Refund>> {
        let payment_id = payment_id.to_string();
        self.run(move |conn| queries::list_refunds_for_payment(conn, &payment_id))
            .await
    }
}

/// Run `f` inside an IMMEDIATE transaction; commit on `Ok`, roll back on `Err`.
fn immediate<T>(conn: &mut Connection, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn conflict(what: &str, id: &str) -> AppError {
    AppError::Internal(format!("Concurrent modification of {} {}", what, id))
}

fn save_payment(tx: &Transaction, payment: &Payment, expected: PaymentStatus) -> Result<()> {
    if !queries::save_payment(tx, payment, expected)? {
        return Err(conflict("payment", &payment.id));
    }
    Ok(())
}

fn advance_order(tx: &Transaction, order: &Order, next: OrderStatus) -> Result<OrderStatus> {
    if !order.status.can_transition_to(next) {
        return Ok(order.status);
    }
    if !queries::update_order_status(tx, &order.id, order.status, next)? {
        return Err(conflict("order", &order.id));
    }
    Ok(next)
}

fn apply_verification(
    tx: &Transaction,
    order_id: &str,
    payment_id: &str,
    signature: &str,
    matched: bool,
) -> Result<VerificationOutcome> {
    let order = queries::get_order(tx, order_id)?.or_unknown_order(order_id)?;

    if let Some(existing) = queries::get_payment(tx, payment_id)? {
        if existing.order_id != order.id {
            if !(matched && existing.is_provisional()) {
                tracing::warn!(
                    "Payment {} belongs to order {}, not {}; refusing verification",
                    payment_id,
                    existing.order_id,
                    order.id
                );
                return Ok(VerificationOutcome {
                    verified: false,
                    payment: None,
                });
            }
            rebind(tx, &existing, &order.id)?;
        }
    }

    let mut payment = queries::get_or_create_payment(tx, payment_id, &order.id)?;
    let before = payment.clone();

    if matched {
        if !payment.verified {
            payment.verified = true;
            payment.signature_presented = Some(signature.to_string());
        }
        if payment.status.can_transition_to(PaymentStatus::Verified) {
            payment.status = PaymentStatus::Verified;
        }
        if payment.capture_confirmed {
            promote_to_captured(&mut payment, &order);
        }
    } else if !payment.verified {
        payment.signature_presented = Some(signature.to_string());
        if payment.status.can_transition_to(PaymentStatus::Rejected) {
            payment.status = PaymentStatus::Rejected;
        }
    }

    if payment != before {
        save_payment(tx, &payment, before.status)?;
    }

    if matched && order.status == OrderStatus::Created {
        advance_order(tx, &order, OrderStatus::Attempted)?;
    }

    Ok(VerificationOutcome {
        verified: matched,
        payment: Some(payment),
    })
}

fn promote_to_captured(payment: &mut Payment, order: &Order) {
    if payment.amount.is_none() {
        payment.amount = Some(order.amount);
    }
    if payment.currency.is_none() {
        payment.currency = Some(order.currency.clone());
    }
    if payment.verified && payment.status.can_transition_to(PaymentStatus::Captured) {
        payment.status = PaymentStatus::Captured;
    }
}

/// Move a provisional payment to the order an authenticated signal names.
fn rebind(tx: &Transaction, payment: &Payment, order_id: &str) -> Result<()> {
    if !queries::rebind_provisional_payment(tx, &payment.id, &payment.order_id, order_id)? {
        return Err(conflict("payment", &payment.id));
    }
    tracing::warn!(
        "Payment {} moved from order {} to {}; earlier binding came from a rejected callback",
        payment.id,
        payment.order_id,
        order_id
    );
    Ok(())
}

/// Find the order an event refers to: the payment's recorded order wins,
/// then the order id carried by the event. A binding made only by a rejected
/// callback yields to the event.
fn resolve_event_order(tx: &Transaction, data: &PaymentEventData) -> Result<Option<Order>> {
    let recorded = queries::get_payment(tx, &data.payment_id)?;

    let order_id = match (recorded, data.order_id.as_deref()) {
        (Some(recorded), Some(claimed)) if recorded.order_id != claimed => {
            if !recorded.is_provisional() {
                tracing::warn!(
                    "Webhook for payment {} names order {} but ledger has {}",
                    data.payment_id,
                    claimed,
                    recorded.order_id
                );
                return Ok(None);
            }
            let Some(order) = queries::get_order(tx, claimed)? else {
                return Ok(None);
            };
            rebind(tx, &recorded, &order.id)?;
            return Ok(Some(order));
        }
        (Some(recorded), _) => recorded.order_id,
        (None, Some(claimed)) => claimed.to_string(),
        (None, None) => return Ok(None),
    };

    queries::get_order(tx, &order_id)
}

fn apply_event(tx: &Transaction, event_id: &str, event: &GatewayEvent) -> Result<EventOutcome> {
    if let Some(existing) = queries::get_webhook_event(tx, event_id)? {
        if existing.processed {
            return Ok(EventOutcome::Duplicate);
        }
    }

    let outcome = match event {
        GatewayEvent::Captured(data) => apply_capture(tx, data)?,
        GatewayEvent::Failed(data) => apply_failure(tx, data)?,
        GatewayEvent::Other(_) => EventOutcome::Acknowledged,
    };

    if !queries::try_mark_webhook_event_processed(tx, event_id)? {
        return Err(AppError::Internal(format!(
            "Webhook event {} was not recorded before processing",
            event_id
        )));
    }

    Ok(outcome)
}

fn apply_capture(tx: &Transaction, data: &PaymentEventData) -> Result<EventOutcome> {
    let Some(order) = resolve_event_order(tx, data)? else {
        tracing::warn!("Capture for payment {} references no known order", data.payment_id);
        return Ok(EventOutcome::Ignored("unknown order"));
    };

    let mut payment = queries::get_or_create_payment(tx, &data.payment_id, &order.id)?;
    let before = payment.clone();

    payment.capture_confirmed = true;
    if let Some(amount) = data.amount {
        payment.amount = Some(amount);
    }
    if let Some(currency) = &data.currency {
        payment.currency = Some(currency.to_ascii_uppercase());
    }
    promote_to_captured(&mut payment, &order);

    if payment.status == PaymentStatus::Failed || payment.status == PaymentStatus::Rejected {
        tracing::warn!(
            "Capture confirmed for payment {} in status {}; status left unchanged",
            payment.id,
            payment.status
        );
    }

    if payment != before {
        save_payment(tx, &payment, before.status)?;
    }

    let order_status = advance_order(tx, &order, OrderStatus::Paid)?;

    tracing::info!(
        "Payment captured: order={} payment={} order_status={} payment_status={}",
        order.id,
        payment.id,
        order_status,
        payment.status
    );

    Ok(EventOutcome::Applied {
        order_id: order.id,
        order_status,
        payment_status: payment.status,
    })
}

fn apply_failure(tx: &Transaction, data: &PaymentEventData) -> Result<EventOutcome> {
    let Some(order) = resolve_event_order(tx, data)? else {
        tracing::warn!("Failure for payment {} references no known order", data.payment_id);
        return Ok(EventOutcome::Ignored("unknown order"));
    };

    let mut payment = queries::get_or_create_payment(tx, &data.payment_id, &order.id)?;
    let before = payment.clone();

    if payment.status.is_settled() {
        tracing::warn!(
            "Ignoring payment.failed for settled payment {} (status {})",
            payment.id,
            payment.status
        );
    } else if payment.status.can_transition_to(PaymentStatus::Failed) {
        payment.status = PaymentStatus::Failed;
        payment.failure_reason = data.error_description.clone();
    }

    if payment != before {
        save_payment(tx, &payment, before.status)?;
    }

    if order.status.is_terminal() {
        tracing::warn!(
            "Ignoring payment.failed for paid order {} (payment {})",
            order.id,
            payment.id
        );
        if payment == before {
            return Ok(EventOutcome::Ignored("order already paid"));
        }
    }

    let order_status = advance_order(tx, &order, OrderStatus::Failed)?;

    tracing::info!(
        "Payment failed: order={} payment={} order_status={} payment_status={} reason={:?}",
        order.id,
        payment.id,
        order_status,
        payment.status,
        payment.failure_reason
    );

    Ok(EventOutcome::Applied {
        order_id: order.id,
        order_status,
        payment_status: payment.status,
    })
}

fn reserve_refund(tx: &Transaction, payment_id: &str, requested: Option<i64>) -> Result<Refund> {
    let payment = queries::get_payment(tx, payment_id)?.or_unknown_payment(payment_id)?;

    if payment.status != PaymentStatus::Captured {
        return Err(AppError::NotCaptured(payment_id.to_string()));
    }

    let available = payment.refundable_amount() - queries::pending_refund_total(tx, payment_id)?;
    if available <= 0 {
        return Err(AppError::Validation(msg::NOTHING_TO_REFUND.into()));
    }

    let amount = requested.unwrap_or(available);
    if amount > available {
        return Err(AppError::Validation(msg::REFUND_EXCEEDS_CAPTURED.into()));
    }

    let currency = match payment.currency.clone() {
        Some(c) => c,
        None => queries::get_order(tx, &payment.order_id)?
            .or_unknown_order(&payment.order_id)?
            .currency,
    };

    let now = queries::now();
    let refund = Refund {
        id: new_refund_id(),
        gateway_refund_id: None,
        payment_id: payment_id.to_string(),
        amount,
        currency,
        status: RefundStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    queries::create_refund(tx, &refund)?;

    Ok(refund)
}

fn complete_refund(
    tx: &Transaction,
    refund_id: &str,
    gateway_refund_id: &str,
    refunded: i64,
) -> Result<(Refund, Payment)> {
    if !queries::mark_refund_processed(tx, refund_id, gateway_refund_id, refunded)? {
        return Err(conflict("refund", refund_id));
    }
    let refund = queries::get_refund(tx, refund_id)?
        .ok_or_else(|| AppError::Internal(format!("Refund {} vanished", refund_id)))?;

    let mut payment =
        queries::get_payment(tx, &refund.payment_id)?.or_unknown_payment(&refund.payment_id)?;
    let expected = payment.status;

    payment.refunded_amount += refund.amount;
    if let Some(captured) = payment.amount.filter(|c| payment.refunded_amount > *c) {
        tracing::error!(
            "Payment {} refunded {} of {} captured",
            payment.id,
            payment.refunded_amount,
            captured
        );
    }
    if payment.refundable_amount() == 0 && payment.status.can_transition_to(PaymentStatus::Refunded)
    {
        payment.status = PaymentStatus::Refunded;
    }
    save_payment(tx, &payment, expected)?;

    Ok((refund, payment))
}
