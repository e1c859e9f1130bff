//! # Payrelay SDK
//!
//! Rust client for a payrelay server: create orders, report checkout
//! completions, poll payment status, retry and refund.
//!
//! ```rust,no_run
//! use payrelay_sdk::{CheckoutOutcome, Payrelay, PayrelayOptions};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Payrelay::new(PayrelayOptions {
//!         base_url: Some("http://localhost:5000".into()),
//!     })?;
//!
//!     let order = client.create_order(Decimal::new(500, 0), Some("INR")).await?;
//!     let (handle, pending) = client.checkout(order);
//!
//!     // Hand `handle` to whatever drives the gateway widget; it calls
//!     // `handle.complete(payment_id, signature)` or `handle.abandon()`.
//!     # handle.abandon();
//!
//!     match pending.outcome().await? {
//!         CheckoutOutcome::Verified { payment_id, .. } => println!("paid with {}", payment_id),
//!         CheckoutOutcome::Rejected { .. } => println!("verification failed"),
//!         CheckoutOutcome::Abandoned { .. } => println!("checkout closed"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! A verified checkout only proves the client saw a genuine completion; the
//! order becomes `paid` once the gateway's capture webhook reaches the server.

pub mod checkout;
pub mod client;
pub mod error;
pub mod types;

pub use checkout::{CheckoutHandle, CheckoutOutcome, PendingCheckout};
pub use client::{DEFAULT_BASE_URL, Payrelay, PayrelayOptions};
pub use error::{PayrelayError, PayrelayErrorCode, Result};
pub use types::{Order, OrderStatus, Payment, PaymentStatus, PaymentStatusResult, Refund};
