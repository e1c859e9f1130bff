//! Checkout continuation.
//!
//! The gateway's checkout widget finishes in one of two ways: it hands back
//! a payment id and signature, or the buyer closes it. [`CheckoutHandle`]
//! carries that result across to a [`PendingCheckout`] waiting on the other
//! side. Both `complete` and `abandon` consume the handle, so a checkout
//! resolves at most once.

use tokio::sync::oneshot;

use crate::client::Payrelay;
use crate::error::Result;
use crate::types::Order;

#[derive(Debug)]
enum Completion {
    Paid {
        payment_id: String,
        signature: String,
    },
    Abandoned,
}

/// How a checkout ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The server accepted the completion signature. The order becomes
    /// `paid` once the gateway's capture webhook arrives.
    Verified { order_id: String, payment_id: String },
    /// The server rejected the completion signature.
    Rejected { order_id: String, payment_id: String },
    /// The buyer closed the widget. Nothing was sent to the server.
    Abandoned { order_id: String },
}

/// Completion side of a checkout, handed to the widget integration.
#[derive(Debug)]
pub struct CheckoutHandle {
    order_id: String,
    tx: oneshot::Sender<Completion>,
}

impl CheckoutHandle {
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Report the widget's success callback.
    pub fn complete(self, payment_id: impl Into<String>, signature: impl Into<String>) {
        // The pending side may already be gone; nothing is waiting then.
        let _ = self.tx.send(Completion::Paid {
            payment_id: payment_id.into(),
            signature: signature.into(),
        });
    }

    /// Report that the buyer closed the widget.
    pub fn abandon(self) {
        let _ = self.tx.send(Completion::Abandoned);
    }
}

/// Waiting side of a checkout.
#[derive(Debug)]
pub struct PendingCheckout {
    client: Payrelay,
    order: Order,
    rx: oneshot::Receiver<Completion>,
}

impl PendingCheckout {
    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Wait for the handle to resolve, then verify a completion with the
    /// server. A dropped handle counts as abandoned.
    pub async fn outcome(self) -> Result<CheckoutOutcome> {
        let order_id = self.order.id;

        let (payment_id, signature) = match self.rx.await {
            Ok(Completion::Paid {
                payment_id,
                signature,
            }) => (payment_id, signature),
            Ok(Completion::Abandoned) | Err(_) => {
                return Ok(CheckoutOutcome::Abandoned { order_id });
            }
        };

        let verified = self
            .client
            .verify_payment(&order_id, &payment_id, &signature)
            .await?;

        Ok(if verified {
            CheckoutOutcome::Verified {
                order_id,
                payment_id,
            }
        } else {
            CheckoutOutcome::Rejected {
                order_id,
                payment_id,
            }
        })
    }
}

pub(crate) fn channel(client: Payrelay, order: Order) -> (CheckoutHandle, PendingCheckout) {
    let (tx, rx) = oneshot::channel();
    let handle = CheckoutHandle {
        order_id: order.id.clone(),
        tx,
    };
    (handle, PendingCheckout { client, order, rx })
}
