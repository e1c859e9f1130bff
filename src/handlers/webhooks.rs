use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use crate::db::AppState;
use crate::error::{AppError, msg};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";
pub const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Gateway notifications. The body is taken as raw bytes so the signature is
/// checked against exactly what was sent.
///
/// Business outcomes (duplicates, unknown orders, ignored anomalies) are all
/// acknowledged with 200. Storage failures answer 500 so the gateway
/// redelivers.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    match state
        .webhooks
        .handle_event(&body, header(SIGNATURE_HEADER), header(EVENT_ID_HEADER))
        .await
    {
        Ok(outcome) => {
            tracing::debug!("Webhook handled: {:?}", outcome);
            (StatusCode::OK, Json(json!({ "status": "ok" })))
        }
        Err(AppError::InvalidSignature) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": msg::INVALID_SIGNATURE })),
        ),
        Err(AppError::Validation(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": msg::INVALID_PAYLOAD })),
        ),
        Err(e) => {
            tracing::error!("Webhook processing failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}
