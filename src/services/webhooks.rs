use std::sync::Arc;

use crate::db::queries::now;
use crate::error::{AppError, Result, msg};
use crate::gateway::parse_webhook;
use crate::id::derive_event_id;
use crate::ledger::{DeliveryState, EventOutcome, Ledger};
use crate::models::WebhookEventRecord;
use crate::signature::SignatureKeys;

#[derive(Clone)]
pub struct WebhookProcessor {
    ledger: Ledger,
    keys: Arc<SignatureKeys>,
}

impl WebhookProcessor {
    pub fn new(ledger: Ledger, keys: Arc<SignatureKeys>) -> Self {
        Self { ledger, keys }
    }

    /// Authenticate, deduplicate and apply one delivery.
    ///
    /// `raw_body` must be the exact bytes received; the signature covers them
    /// byte for byte. Nothing is recorded for a delivery that fails
    /// authentication or parsing.
    pub async fn handle_event(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<EventOutcome> {
        let Some(signature) = signature.filter(|s| !s.is_empty()) else {
            tracing::warn!("Webhook rejected: {}", msg::MISSING_SIGNATURE);
            return Err(AppError::InvalidSignature);
        };

        if !self.keys.verify_webhook(raw_body, signature) {
            tracing::warn!("Webhook rejected: signature mismatch ({} bytes)", raw_body.len());
            return Err(AppError::InvalidSignature);
        }

        let parsed = parse_webhook(raw_body)?;
        let received_at = now();
        let payment = parsed.event.payment();

        let event_id = match event_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => derive_event_id(
                parsed.event.event_type(),
                payment.map(|p| p.payment_id.as_str()),
                parsed.created_at.unwrap_or(received_at),
            ),
        };

        let record = WebhookEventRecord {
            event_id: event_id.clone(),
            event_type: parsed.event.event_type().to_string(),
            payment_id: payment.map(|p| p.payment_id.clone()),
            order_id: payment.and_then(|p| p.order_id.clone()),
            raw_body: raw_body.to_vec(),
            processed: false,
            received_at,
            processed_at: None,
        };

        match self.ledger.record_delivery(record).await? {
            DeliveryState::AlreadyProcessed => {
                tracing::info!("Duplicate webhook {} ignored", event_id);
                return Ok(EventOutcome::Duplicate);
            }
            DeliveryState::Redelivered => {
                tracing::info!("Retrying unprocessed webhook {}", event_id)
            }
            DeliveryState::New => {
                tracing::debug!("Recorded webhook {} ({})", event_id, parsed.event.event_type())
            }
        }

        let event_type = parsed.event.event_type().to_string();
        let outcome = self.ledger.apply_event(&event_id, parsed.event).await?;

        match &outcome {
            EventOutcome::Ignored(reason) => {
                tracing::warn!(
                    "Webhook {} ({}) processed without effect: {}",
                    event_id,
                    event_type,
                    reason
                )
            }
            EventOutcome::Acknowledged => {
                tracing::debug!("Webhook {} ({}) acknowledged", event_id, event_type)
            }
            _ => {}
        }

        Ok(outcome)
    }
}
