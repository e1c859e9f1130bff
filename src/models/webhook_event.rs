use serde::{Deserialize, Serialize};

/// Stored record of an inbound webhook delivery, keyed by event id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub event_id: String,
    pub event_type: String,
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    /// Exact bytes as received
    #[serde(skip)]
    pub raw_body: Vec<u8>,
    pub processed: bool,
    pub received_at: i64,
    pub processed_at: Option<i64>,
}

/// Payment details carried by a payment lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEventData {
    pub payment_id: String,
    pub order_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub error_description: Option<String>,
}

/// Provider-agnostic gateway event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Funds captured - settles the payment and pays the order
    Captured(PaymentEventData),
    /// Payment failed at the gateway
    Failed(PaymentEventData),
    /// Authenticated but not relevant to the ledger
    Other(String),
}

impl GatewayEvent {
    pub fn event_type(&self) -> &str {
        match self {
            Self::Captured(_) => "payment.captured",
            Self::Failed(_) => "payment.failed",
            Self::Other(raw) => raw,
        }
    }

    pub fn payment(&self) -> Option<&PaymentEventData> {
        match self {
            Self::Captured(data) | Self::Failed(data) => Some(data),
            Self::Other(_) => None,
        }
    }
}

/// A parsed delivery: the event plus what is needed to identify it.
#[derive(Debug, Clone)]
pub struct ParsedWebhook {
    pub event: GatewayEvent,
    /// Gateway's `created_at` (unix seconds), if present
    pub created_at: Option<i64>,
}
