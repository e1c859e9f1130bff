use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{Order, Payment};
use crate::money::deserialize_amount;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Major units (e.g. rupees), as a JSON number or numeric string
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub order: Order,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .orders
        .create_order(req.amount, req.currency.as_deref())
        .await?;

    Ok(Json(OrderResponse {
        success: true,
        order,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPaymentRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPaymentResponse {
    pub success: bool,
    pub new_order: Order,
}

pub async fn retry_payment(
    State(state): State<AppState>,
    Json(req): Json<RetryPaymentRequest>,
) -> Result<Json<RetryPaymentResponse>> {
    let new_order = state.retries.retry(&req.order_id).await?;

    Ok(Json(RetryPaymentResponse {
        success: true,
        new_order,
    }))
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub order: Order,
    pub payments: Vec<Payment>,
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>> {
    let (order, payments) = state
        .ledger
        .order_with_payments(&order_id)
        .await?
        .or_unknown_order(&order_id)?;

    Ok(Json(PaymentStatusResponse {
        success: true,
        order,
        payments,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/retry-payment", post(retry_payment))
        .route("/payment-status/{order_id}", get(payment_status))
}
