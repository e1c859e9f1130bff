//! Payrelay - payment lifecycle relay for a Razorpay-style gateway
//!
//! Creates gateway orders, verifies client-reported completions, applies
//! signed webhook notifications idempotently to a SQLite ledger, and runs
//! retries and refunds against it.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod id;
pub mod ledger;
pub mod models;
pub mod money;
pub mod services;
pub mod signature;
