//! Type definitions for the Payrelay SDK

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Attempted,
    Paid,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
    Failed,
    Captured,
    Refunded,
    #[serde(other)]
    Unknown,
}

/// An order as recorded by the server. Amounts are in subunits.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: OrderStatus,
    /// Successor created by a retry
    pub superseded_by: Option<String>,
    pub retry_of: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub verified: bool,
    pub capture_confirmed: bool,
    pub status: PaymentStatus,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub refunded_amount: i64,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
    pub gateway_refund_id: Option<String>,
    pub payment_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Result of `GET /payment-status/{orderId}`
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResult {
    pub order: Order,
    pub payments: Vec<Payment>,
}

impl PaymentStatusResult {
    pub fn is_paid(&self) -> bool {
        self.order.status == OrderStatus::Paid
    }
}

// ============ Wire responses ============

#[derive(Debug, Deserialize)]
pub(crate) struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RetryResponse {
    pub new_order: Order,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefundResponse {
    pub refund: Refund,
}
