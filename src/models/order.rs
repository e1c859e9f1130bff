use serde::{Deserialize, Serialize};

/// A merchant request for a specific amount, identified by the gateway's order id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: String,
    /// Amount in subunits (paise, cents)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: OrderStatus,
    /// Successor created by a retry (lookup only)
    pub superseded_by: Option<String>,
    /// Order this one was created to replace
    pub retry_of: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data required to record a freshly created order
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub retry_of: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Attempted,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Attempted => "attempted",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Transition table. `Paid` is terminal; a capture may still lift a
    /// `Failed` order to `Paid` because the gateway holds the funds.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, Attempted)
                | (Created, Paid)
                | (Created, Failed)
                | (Attempted, Paid)
                | (Attempted, Failed)
                | (Failed, Paid)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "attempted" => Ok(Self::Attempted),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
