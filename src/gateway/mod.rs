mod razorpay;

pub use razorpay::*;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Order creation request sent to the gateway. Amounts are in subunits.
#[derive(Debug, Clone, Serialize)]
pub struct NewGatewayOrder {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOrderStatus {
    Created,
    Attempted,
    Paid,
    #[serde(other)]
    Unknown,
}

/// The gateway's view of an order.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: GatewayOrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Request/response API of the external payment gateway.
///
/// Every failure, including timeouts, is reported as `AppError::Gateway`.
/// Implementations never retry on their own.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &NewGatewayOrder) -> Result<GatewayOrder>;

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder>;

    /// Refund `amount` subunits of a captured payment.
    async fn refund_payment(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund>;
}
