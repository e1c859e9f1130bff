use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use super::{GatewayOrder, GatewayRefund, NewGatewayOrder, PaymentGateway};
use crate::config::Config;
use crate::error::{AppError, Result, msg};
use crate::models::{GatewayEvent, ParsedWebhook, PaymentEventData};

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.gateway_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: String::from_utf8_lossy(config.key_secret.expose()).into_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a gateway response into a typed body, or a `Gateway` error carrying
    /// the gateway's own description.
    async fn read<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<RazorpayErrorBody>(&text) {
                Ok(body) => body
                    .error
                    .description
                    .or(body.error.code)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) if text.is_empty() => status.to_string(),
                Err(_) => text,
            };
            return Err(AppError::Gateway(message));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse gateway response: {}", e)))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Gateway("Gateway request timed out".into())
    } else {
        AppError::Gateway(format!("Gateway request failed: {}", e))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, order: &NewGatewayOrder) -> Result<GatewayOrder> {
        let response = self
            .client
            .post(self.url("/orders"))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(order)
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder> {
        let response = self
            .client
            .get(self.url(&format!("/orders/{}", order_id)))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }

    async fn refund_payment(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund> {
        let response = self
            .client
            .post(self.url(&format!("/payments/{}/refund", payment_id)))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({ "amount": amount }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::read(response).await
    }
}

// ============ Webhook payloads ============

#[derive(Debug, Deserialize)]
struct RazorpayWebhook {
    event: String,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    payload: RazorpayWebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
struct RazorpayWebhookPayload {
    #[serde(default)]
    payment: Option<RazorpayEntity<RazorpayPayment>>,
}

#[derive(Debug, Deserialize)]
struct RazorpayEntity<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl From<RazorpayPayment> for PaymentEventData {
    fn from(p: RazorpayPayment) -> Self {
        PaymentEventData {
            payment_id: p.id,
            order_id: p.order_id,
            amount: p.amount,
            currency: p.currency,
            error_description: p.error_description,
        }
    }
}

/// Parse an already-authenticated webhook body.
///
/// Payment lifecycle events must carry a payment entity; other event types
/// are passed through as `GatewayEvent::Other`.
pub fn parse_webhook(body: &[u8]) -> Result<ParsedWebhook> {
    let webhook: RazorpayWebhook = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Unparseable webhook body: {}", e);
        AppError::Validation(msg::INVALID_PAYLOAD.into())
    })?;

    let payment = webhook.payload.payment.map(|p| PaymentEventData::from(p.entity));

    let event = match (webhook.event.as_str(), payment) {
        ("payment.captured", Some(data)) => GatewayEvent::Captured(data),
        ("payment.failed", Some(data)) => GatewayEvent::Failed(data),
        ("payment.captured" | "payment.failed", None) => {
            tracing::warn!("Webhook {} carries no payment entity", webhook.event);
            return Err(AppError::Validation(msg::INVALID_PAYLOAD.into()));
        }
        (other, _) => GatewayEvent::Other(other.to_string()),
    };

    Ok(ParsedWebhook {
        event,
        created_at: webhook.created_at,
    })
}
