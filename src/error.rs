use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing error messages shared between services and handlers.
pub mod msg {
    pub const MISSING_KEY_ID: &str = "RAZORPAY_KEY_ID is not set";
    pub const MISSING_KEY_SECRET: &str = "RAZORPAY_KEY_SECRET is not set";
    pub const EMPTY_SECRET: &str = "Signing secret must not be empty";

    pub const AMOUNT_NOT_POSITIVE: &str = "Amount must be greater than zero";
    pub const AMOUNT_TOO_PRECISE: &str = "Amount has more precision than the currency subunit allows";
    pub const AMOUNT_TOO_LARGE: &str = "Amount is too large";
    pub const INVALID_CURRENCY: &str = "Currency must be a three-letter ISO code";
    pub const REFUND_EXCEEDS_CAPTURED: &str = "Refund amount exceeds the refundable balance";
    pub const NOTHING_TO_REFUND: &str = "Payment has no refundable balance";

    pub const INVALID_SIGNATURE: &str = "Invalid signature";
    pub const INVALID_PAYLOAD: &str = "Invalid payload";
    pub const MISSING_SIGNATURE: &str = "Missing signature";

    pub const PAYMENT_VERIFIED: &str = "Payment verified";
    pub const PAYMENT_NOT_VERIFIED: &str = "Payment verification failed";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Unknown payment: {0}")]
    UnknownPayment(String),

    #[error("Payment {0} has not been captured")]
    NotCaptured(String),

    #[error("Order {0} is already paid")]
    AlreadyPaid(String),

    #[error("Order {order_id} was already retried as {successor_id}")]
    AlreadySuperseded {
        order_id: String,
        successor_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable reason code returned alongside `success: false`.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::Validation(_) => "validation_error",
            AppError::Gateway(_) => "gateway_error",
            AppError::InvalidSignature => "invalid_signature",
            AppError::UnknownOrder(_) => "unknown_order",
            AppError::UnknownPayment(_) => "unknown_payment",
            AppError::NotCaptured(_) => "not_captured",
            AppError::AlreadyPaid(_) => "already_paid",
            AppError::AlreadySuperseded { .. } => "already_superseded",
            AppError::Json(_) => "invalid_json",
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidSignature
            | AppError::UnknownOrder(_)
            | AppError::UnknownPayment(_)
            | AppError::NotCaptured(_)
            | AppError::AlreadyPaid(_)
            | AppError::AlreadySuperseded { .. }
            | AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    reason: &'static str,
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match &self {
            AppError::InvalidSignature => {
                tracing::warn!("Rejected request with invalid signature");
                msg::INVALID_SIGNATURE.to_string()
            }
            AppError::Gateway(message) => {
                tracing::error!("Gateway error: {}", message);
                self.to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Configuration(message) | AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                "Internal server error".to_string()
            }
            AppError::Json(e) => {
                tracing::debug!("JSON error: {}", e);
                "Invalid JSON".to_string()
            }
            AppError::Validation(message) => message.clone(),
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error,
            reason: self.reason(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Lookup helpers for `Option` results coming back from the ledger.
pub trait OptionExt<T> {
    fn or_unknown_order(self, order_id: &str) -> Result<T>;
    fn or_unknown_payment(self, payment_id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_unknown_order(self, order_id: &str) -> Result<T> {
        self.ok_or_else(|| AppError::UnknownOrder(order_id.to_string()))
    }

    fn or_unknown_payment(self, payment_id: &str) -> Result<T> {
        self.ok_or_else(|| AppError::UnknownPayment(payment_id.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
