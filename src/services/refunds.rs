use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::gateway::PaymentGateway;
use crate::ledger::Ledger;
use crate::models::Refund;
use crate::money::to_subunits;

#[derive(Clone)]
pub struct RefundService {
    ledger: Ledger,
    gateway: Arc<dyn PaymentGateway>,
}

impl RefundService {
    pub fn new(ledger: Ledger, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { ledger, gateway }
    }

    /// Refund `amount` major units of a captured payment, or its whole
    /// remaining balance when `amount` is `None`.
    ///
    /// The amount is reserved in the ledger before the gateway is called, so
    /// concurrent refunds can never exceed the captured amount.
    pub async fn refund(&self, payment_id: &str, amount: Option<Decimal>) -> Result<Refund> {
        let amount = amount.map(to_subunits).transpose()?;
        let reservation = self.ledger.reserve_refund(payment_id, amount).await?;

        let gateway_refund = match self
            .gateway
            .refund_payment(payment_id, reservation.amount)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    "Gateway refused refund {} of {} for payment {}: {}",
                    reservation.id,
                    reservation.amount,
                    payment_id,
                    e
                );
                if let Err(release) = self.ledger.release_refund(&reservation.id).await {
                    tracing::error!(
                        "Failed to release refund reservation {}: {}",
                        reservation.id,
                        release
                    );
                }
                return Err(e);
            }
        };

        if gateway_refund.amount != reservation.amount {
            tracing::warn!(
                "Gateway refund {} is for {} but {} was requested; booking the gateway amount",
                gateway_refund.id,
                gateway_refund.amount,
                reservation.amount
            );
        }

        let (refund, payment) = self
            .ledger
            .complete_refund(&reservation.id, &gateway_refund.id, gateway_refund.amount)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    "Gateway refund {} succeeded but reservation {} could not be completed: {}",
                    gateway_refund.id,
                    reservation.id,
                    e
                )
            })?;

        tracing::info!(
            "Refund processed: payment={} refund={} amount={} refunded_total={} status={}",
            payment.id,
            refund.id,
            refund.amount,
            payment.refunded_amount,
            payment.status
        );

        Ok(refund)
    }
}
