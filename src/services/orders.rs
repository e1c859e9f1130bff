use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{AppError, Result};
use crate::gateway::{NewGatewayOrder, PaymentGateway};
use crate::id::new_receipt;
use crate::ledger::Ledger;
use crate::models::{CreateOrder, Order};
use crate::money::{normalize_currency, to_subunits};

#[derive(Clone)]
pub struct OrderService {
    ledger: Ledger,
    gateway: Arc<dyn PaymentGateway>,
    default_currency: String,
}

impl OrderService {
    pub fn new(ledger: Ledger, gateway: Arc<dyn PaymentGateway>, default_currency: String) -> Self {
        Self {
            ledger,
            gateway,
            default_currency,
        }
    }

    /// Create an order for `amount` major units. A blank or absent currency
    /// uses the configured default.
    pub async fn create_order(&self, amount: Decimal, currency: Option<&str>) -> Result<Order> {
        let amount = to_subunits(amount)?;
        let currency = match currency.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => normalize_currency(code)?,
            None => self.default_currency.clone(),
        };

        self.open(amount, currency, None).await
    }

    /// Open an order at the gateway and record it in the ledger.
    pub(crate) async fn open(
        &self,
        amount: i64,
        currency: String,
        retry_of: Option<&str>,
    ) -> Result<Order> {
        let receipt = new_receipt();
        let mut notes = BTreeMap::new();
        if let Some(original) = retry_of {
            notes.insert("retry_of".to_string(), original.to_string());
        }

        let request = NewGatewayOrder {
            amount,
            currency: currency.clone(),
            receipt: receipt.clone(),
            notes,
        };
        let created = self.gateway.create_order(&request).await?;

        if created.amount != amount || !created.currency.eq_ignore_ascii_case(&currency) {
            return Err(AppError::Gateway(format!(
                "Gateway created order {} for {} {} instead of {} {}",
                created.id, created.amount, created.currency, amount, currency
            )));
        }

        let order = self
            .ledger
            .record_order(CreateOrder {
                id: created.id,
                amount,
                currency,
                receipt,
                retry_of: retry_of.map(str::to_string),
            })
            .await?;

        tracing::info!(
            "Order created: id={} amount={} currency={} receipt={}",
            order.id,
            order.amount,
            order.currency,
            order.receipt
        );

        Ok(order)
    }
}
