use serde::{Deserialize, Serialize};

/// A refund against a captured payment.
///
/// Rows are inserted as `Pending` to reserve the amount before the gateway
/// call, then flipped to `Processed` once the gateway accepts the refund.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Refund {
    pub id: String,
    pub gateway_refund_id: Option<String>,
    pub payment_id: String,
    /// Subunits
    pub amount: i64,
    pub currency: String,
    pub status: RefundStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Processed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
        }
    }
}

impl std::str::FromStr for RefundStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            _ => Err(()),
        }
    }
}
