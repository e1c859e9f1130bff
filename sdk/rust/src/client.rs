//! HTTP client for a payrelay server

use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checkout::{self, CheckoutHandle, PendingCheckout};
use crate::error::{PayrelayError, PayrelayErrorCode, Result};
use crate::types::*;

/// Default payrelay server URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration options for the Payrelay client
#[derive(Debug, Clone, Default)]
pub struct PayrelayOptions {
    /// Server URL (default: "http://localhost:5000")
    pub base_url: Option<String>,
}

/// Payrelay SDK client.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct Payrelay {
    base_url: String,
    http: HttpClient,
}

impl Payrelay {
    pub fn new(options: PayrelayOptions) -> Result<Self> {
        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        if base_url.is_empty() {
            return Err(PayrelayError::validation("Base URL must not be empty"));
        }

        let http = HttpClient::builder()
            .user_agent("payrelay-sdk-rust/0.1.0")
            .build()
            .map_err(|e| PayrelayError::network(e.to_string()))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ==================== Orders ====================

    /// Create an order for `amount` major units. `None` uses the server's
    /// default currency.
    pub async fn create_order(&self, amount: Decimal, currency: Option<&str>) -> Result<Order> {
        if amount <= Decimal::ZERO {
            return Err(PayrelayError::validation("Amount must be greater than zero"));
        }

        #[derive(Serialize)]
        struct CreateOrderRequest<'a> {
            amount: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            currency: Option<&'a str>,
        }

        let response: OrderResponse = self
            .post(
                "/create-order",
                &CreateOrderRequest {
                    amount: amount.normalize().to_string(),
                    currency,
                },
            )
            .await?;
        Ok(response.order)
    }

    /// Replace an unpaid order with a fresh one for the same amount.
    pub async fn retry_payment(&self, order_id: &str) -> Result<Order> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RetryRequest<'a> {
            order_id: &'a str,
        }

        let response: RetryResponse = self
            .post("/retry-payment", &RetryRequest { order_id })
            .await?;
        Ok(response.new_order)
    }

    pub async fn payment_status(&self, order_id: &str) -> Result<PaymentStatusResult> {
        if order_id.is_empty() {
            return Err(PayrelayError::validation("Order id must not be empty"));
        }
        self.get(&format!("/payment-status/{}", order_id)).await
    }

    // ==================== Payments ====================

    /// Report a checkout completion. Returns whether the server accepted the
    /// signature; a rejection is not an error.
    pub async fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        #[derive(Serialize)]
        struct VerifyRequest<'a> {
            razorpay_order_id: &'a str,
            razorpay_payment_id: &'a str,
            razorpay_signature: &'a str,
        }

        let response: VerifyResponse = self
            .post(
                "/verify-payment",
                &VerifyRequest {
                    razorpay_order_id: order_id,
                    razorpay_payment_id: payment_id,
                    razorpay_signature: signature,
                },
            )
            .await?;
        Ok(response.verified)
    }

    /// Refund `amount` major units, or the remaining balance when `None`.
    pub async fn refund_payment(&self, payment_id: &str, amount: Option<Decimal>) -> Result<Refund> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RefundRequest<'a> {
            payment_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            amount: Option<String>,
        }

        let response: RefundResponse = self
            .post(
                "/refund-payment",
                &RefundRequest {
                    payment_id,
                    amount: amount.map(|a| a.normalize().to_string()),
                },
            )
            .await?;
        Ok(response.refund)
    }

    // ==================== Checkout ====================

    /// Create an order and open a checkout continuation for it.
    pub async fn start_checkout(
        &self,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<(CheckoutHandle, PendingCheckout)> {
        let order = self.create_order(amount, currency).await?;
        Ok(self.checkout(order))
    }

    /// Open a checkout continuation for an existing order.
    ///
    /// The handle goes to whatever drives the gateway widget; the pending
    /// side resolves once the handle is completed, abandoned or dropped.
    pub fn checkout(&self, order: Order) -> (CheckoutHandle, PendingCheckout) {
        checkout::channel(self.clone(), order)
    }

    // ==================== Internal Helpers ====================

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PayrelayError::network(e.to_string()))?;

        handle_response(response).await
    }

    async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PayrelayError::network(e.to_string()))?;

        handle_response(response).await
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    reason: Option<String>,
}

async fn handle_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status().as_u16();

    if !response.status().is_success() {
        let body: Option<ErrorResponse> = response.json().await.ok();
        return Err(error_from_body(status, body));
    }

    response
        .json()
        .await
        .map_err(|e| PayrelayError::network(e.to_string()))
}

fn error_from_body(status: u16, body: Option<ErrorResponse>) -> PayrelayError {
    let (error, reason) = match body {
        Some(b) => (b.error, b.reason),
        None => (None, None),
    };

    let code = match reason.as_deref() {
        Some(reason) => PayrelayErrorCode::from_reason(reason),
        None if status >= 500 => PayrelayErrorCode::Server,
        None => PayrelayErrorCode::Unknown,
    };
    let message = error.unwrap_or_else(|| format!("Request failed: {}", status));

    PayrelayError::with_status(code, message, status)
}

impl std::fmt::Debug for Payrelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payrelay")
            .field("base_url", &self.base_url)
            .finish()
    }
}
