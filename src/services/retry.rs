use std::sync::Arc;

use crate::error::{AppError, OptionExt, Result};
use crate::gateway::{GatewayOrderStatus, PaymentGateway};
use crate::ledger::Ledger;
use crate::models::{Order, OrderStatus};

use super::OrderService;

#[derive(Clone)]
pub struct RetryService {
    ledger: Ledger,
    gateway: Arc<dyn PaymentGateway>,
    orders: OrderService,
}

impl RetryService {
    pub fn new(ledger: Ledger, gateway: Arc<dyn PaymentGateway>, orders: OrderService) -> Self {
        Self {
            ledger,
            gateway,
            orders,
        }
    }

    /// Create a successor for an unpaid order. The original keeps its status
    /// and gains a `superseded_by` link; at most one successor is ever linked.
    pub async fn retry(&self, order_id: &str) -> Result<Order> {
        let original = self.ledger.order(order_id).await?.or_unknown_order(order_id)?;

        if original.status == OrderStatus::Paid {
            return Err(AppError::AlreadyPaid(original.id));
        }
        if let Some(successor_id) = original.superseded_by {
            return Err(AppError::AlreadySuperseded {
                order_id: original.id,
                successor_id,
            });
        }

        let remote = self.gateway.fetch_order(&original.id).await?;
        if remote.status == GatewayOrderStatus::Paid {
            tracing::info!(
                "Gateway reports order {} paid while ledger has {}; not retrying",
                original.id,
                original.status
            );
            return Err(AppError::AlreadyPaid(original.id));
        }

        let successor = self
            .orders
            .open(original.amount, original.currency.clone(), Some(&original.id))
            .await?;

        if !self.ledger.link_successor(&original.id, &successor.id).await? {
            let current = self
                .ledger
                .order(&original.id)
                .await?
                .or_unknown_order(&original.id)?;
            let successor_id = current.superseded_by.unwrap_or_default();
            tracing::warn!(
                "Order {} was retried concurrently; {} left unlinked in favour of {}",
                original.id,
                successor.id,
                successor_id
            );
            return Err(AppError::AlreadySuperseded {
                order_id: original.id,
                successor_id,
            });
        }

        tracing::info!("Order {} retried as {}", original.id, successor.id);
        Ok(successor)
    }
}
