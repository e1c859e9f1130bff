//! Error types for the Payrelay SDK

use thiserror::Error;

/// Machine-readable error code, mirroring the server's `reason` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayrelayErrorCode {
    Validation,
    Gateway,
    InvalidSignature,
    UnknownOrder,
    UnknownPayment,
    NotCaptured,
    AlreadyPaid,
    AlreadySuperseded,
    /// Server could not be reached or answered with something unreadable
    Network,
    Server,
    Unknown,
}

impl PayrelayErrorCode {
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "validation_error" | "invalid_json" => Self::Validation,
            "gateway_error" => Self::Gateway,
            "invalid_signature" => Self::InvalidSignature,
            "unknown_order" => Self::UnknownOrder,
            "unknown_payment" => Self::UnknownPayment,
            "not_captured" => Self::NotCaptured,
            "already_paid" => Self::AlreadyPaid,
            "already_superseded" => Self::AlreadySuperseded,
            "internal_error" | "configuration_error" => Self::Server,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct PayrelayError {
    pub code: PayrelayErrorCode,
    pub message: String,
    /// HTTP status, when the server answered
    pub status: Option<u16>,
}

impl PayrelayError {
    pub fn new(code: PayrelayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(code: PayrelayErrorCode, message: impl Into<String>, status: u16) -> Self {
        Self {
            code,
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(PayrelayErrorCode::Validation, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PayrelayErrorCode::Network, message)
    }

    /// True when trying again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            PayrelayErrorCode::Network | PayrelayErrorCode::Gateway | PayrelayErrorCode::Server
        )
    }
}

pub type Result<T> = std::result::Result<T, PayrelayError>;
