use std::env;
use std::time::Duration;

use crate::error::{AppError, Result, msg};
use crate::money::normalize_currency;
use crate::signature::SigningSecret;

pub const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub key_id: String,
    /// Signs payment-completion callbacks and authenticates gateway API calls.
    pub key_secret: SigningSecret,
    /// Signs webhook deliveries. Falls back to the key secret when unset.
    pub webhook_secret: SigningSecret,
    pub gateway_base_url: String,
    pub gateway_timeout: Duration,
    pub default_currency: String,
    /// Days to keep processed webhook events (0 = never purge)
    pub webhook_retention_days: i64,
    pub dev_mode: bool,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    ///
    /// Fails closed: a missing key id or secret is a configuration error, so the
    /// verification paths never start with checks silently disabled.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dev_mode = lookup("PAYRELAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let key_id = non_empty("RAZORPAY_KEY_ID")
            .ok_or_else(|| AppError::Configuration(msg::MISSING_KEY_ID.into()))?;
        let key_secret = non_empty("RAZORPAY_KEY_SECRET")
            .ok_or_else(|| AppError::Configuration(msg::MISSING_KEY_SECRET.into()))?;
        let key_secret = SigningSecret::new(key_secret)?;

        let webhook_secret = match non_empty("RAZORPAY_WEBHOOK_SECRET") {
            Some(secret) => SigningSecret::new(secret)?,
            None => {
                tracing::warn!(
                    "RAZORPAY_WEBHOOK_SECRET not set, webhooks will be verified with the key secret"
                );
                key_secret.clone()
            }
        };

        let default_currency = match non_empty("DEFAULT_CURRENCY") {
            Some(c) => normalize_currency(&c).map_err(|_| {
                AppError::Configuration(format!("DEFAULT_CURRENCY is not a valid code: {}", c))
            })?,
            None => "INR".to_string(),
        };

        let port: u16 = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let gateway_timeout_secs: u64 = lookup("GATEWAY_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|s| *s > 0)
            .unwrap_or(10);

        let webhook_retention_days: i64 = lookup("WEBHOOK_EVENT_RETENTION_DAYS")
            .and_then(|s| s.parse().ok())
            .filter(|d| *d >= 0)
            .unwrap_or(7);

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "payrelay.db".to_string()),
            key_id,
            key_secret,
            webhook_secret,
            gateway_base_url: non_empty("RAZORPAY_API_BASE")
                .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string()),
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            default_currency,
            webhook_retention_days,
            dev_mode,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
