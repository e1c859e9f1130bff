use serde::{Deserialize, Serialize};

/// One attempt to settle an order, identified by the gateway's payment id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    /// Raw signature from the client callback
    #[serde(skip_serializing)]
    pub signature_presented: Option<String>,
    /// Set once by a matching callback signature, never reverted
    pub verified: bool,
    /// Set once an authenticated `payment.captured` webhook has been applied
    pub capture_confirmed: bool,
    pub status: PaymentStatus,
    /// Captured amount in subunits, as reported by the gateway
    pub amount: Option<i64>,
    pub currency: Option<String>,
    /// Cumulative processed refunds in subunits
    pub refunded_amount: i64,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Payment {
    /// Subunits still available for refund, ignoring in-flight reservations.
    pub fn refundable_amount(&self) -> i64 {
        self.amount.map(|a| a - self.refunded_amount).unwrap_or(0).max(0)
    }

    /// True while the only thing known about this payment is a rejected,
    /// unauthenticated callback. Its order binding is then not trusted.
    pub fn is_provisional(&self) -> bool {
        !self.verified && !self.capture_confirmed && self.status == PaymentStatus::Rejected
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    /// Client signature did not match
    Rejected,
    /// Gateway reported the payment as failed
    Failed,
    Captured,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Captured => "captured",
            Self::Refunded => "refunded",
        }
    }

    /// Transition table. Capture requires a prior verification (only
    /// `Verified` may capture); `Captured` and `Refunded` are never failed.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Verified)
                | (Pending, Rejected)
                | (Pending, Failed)
                | (Rejected, Verified)
                | (Rejected, Failed)
                | (Verified, Captured)
                | (Verified, Failed)
                | (Captured, Refunded)
        )
    }

    /// Funds have settled (or been returned); failure signals no longer apply.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Captured | Self::Refunded)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            "failed" => Ok(Self::Failed),
            "captured" => Ok(Self::Captured),
            "refunded" => Ok(Self::Refunded),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
