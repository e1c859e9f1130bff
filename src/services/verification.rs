use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::ledger::Ledger;
use crate::signature::SignatureKeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub verified: bool,
}

/// Checks client-reported completions against the callback signature.
#[derive(Clone)]
pub struct VerificationService {
    ledger: Ledger,
    keys: Arc<SignatureKeys>,
}

impl VerificationService {
    pub fn new(ledger: Ledger, keys: Arc<SignatureKeys>) -> Self {
        Self { ledger, keys }
    }

    /// A mismatch is a normal outcome (`verified: false`), not an error.
    /// The order is never marked paid here; that takes the capture webhook.
    pub async fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerificationResult> {
        if order_id.trim().is_empty() || payment_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Order id and payment id are required".into(),
            ));
        }

        let matched = self.keys.verify_callback(order_id, payment_id, signature);
        if !matched {
            tracing::warn!(
                "Callback signature mismatch: order={} payment={}",
                order_id,
                payment_id
            );
        }

        let outcome = self
            .ledger
            .apply_verification(order_id, payment_id, signature, matched)
            .await?;

        if let Some(payment) = &outcome.payment {
            tracing::info!(
                "Payment verification: order={} payment={} verified={} status={}",
                order_id,
                payment_id,
                outcome.verified,
                payment.status
            );
        }

        Ok(VerificationResult {
            verified: outcome.verified,
        })
    }
}
