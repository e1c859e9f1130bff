pub mod orders;
pub mod payments;
pub mod webhooks;

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Every route the server exposes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(orders::router())
        .merge(payments::router())
        .merge(webhooks::router())
}
