use axum::{Router, extract::State, routing::post};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{Result, msg};
use crate::extractors::Json;
use crate::models::Refund;
use crate::money::deserialize_optional_amount;

/// Fields as posted by the gateway's checkout callback.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub verified: bool,
    pub message: &'static str,
}

/// A signature mismatch is answered with 200 and `success: false`.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    let result = state
        .verification
        .verify_payment(
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
        )
        .await?;

    Ok(Json(VerifyPaymentResponse {
        success: result.verified,
        verified: result.verified,
        message: if result.verified {
            msg::PAYMENT_VERIFIED
        } else {
            msg::PAYMENT_NOT_VERIFIED
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    pub payment_id: String,
    /// Major units; absent means the whole remaining balance
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct RefundPaymentResponse {
    pub success: bool,
    pub refund: Refund,
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Json(req): Json<RefundPaymentRequest>,
) -> Result<Json<RefundPaymentResponse>> {
    let refund = state.refunds.refund(&req.payment_id, req.amount).await?;

    Ok(Json(RefundPaymentResponse {
        success: true,
        refund,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/verify-payment", post(verify_payment))
        .route("/refund-payment", post(refund_payment))
}
