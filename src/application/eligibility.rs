//! Eligibility gate for capture, cancel and refund.
//!
//! Every check fetches the live payment resource and fails closed: a missing resource id or any
//! gateway error denies the action.

use crate::application::engine::PaymentEngine;
use crate::domain::money::ELIGIBILITY_THRESHOLD;
use crate::domain::order::{Order, OrderId};
use crate::domain::payment::RemainingKind;
use crate::domain::transaction::TransactionType;
use crate::error::Result;
use rust_decimal::Decimal;
use tracing::debug;

impl PaymentEngine {
    pub async fn can_capture(&self, order: &Order, _amount: Option<Decimal>) -> bool {
        self.remaining_allows(order, RemainingKind::Capture).await
    }

    pub async fn can_cancel(&self, order: &Order, _amount: Option<Decimal>) -> bool {
        self.remaining_allows(order, RemainingKind::Cancellation).await
    }

    /// Checkout orders are gated on the payment order's remaining reversal amount. Other methods
    /// subtract the reversals already on the payment from the order amount.
    pub async fn can_refund(&self, order: &Order, amount: Option<Decimal>) -> bool {
        if order.payment_method.is_checkout() {
            return self.remaining_allows(order, RemainingKind::Reversal).await;
        }

        let Some(payment_id) = order.resource_id() else {
            debug!(order_id = %order.order_id, "No payment id, refund denied");
            return false;
        };

        let transactions = match self.gateway.fetch_transactions_list(payment_id).await {
            Ok(transactions) => transactions,
            Err(e) => {
                debug!(order_id = %order.order_id, error = %e, "Failed to fetch transactions, refund denied");
                return false;
            }
        };

        let refunded: Decimal = transactions
            .iter()
            .filter(|tx| tx.r#type == TransactionType::Reversal && !tx.is_failed())
            .map(|tx| tx.major_amount())
            .sum();
        let requested = amount.filter(|a| !a.is_zero()).unwrap_or(order.amount);

        requested <= order.amount - refunded
    }

    pub async fn can_capture_order(&self, order_id: &OrderId, amount: Option<Decimal>) -> Result<bool> {
        let order = self.store.get_order(order_id).await?;
        Ok(self.can_capture(&order, amount).await)
    }

    pub async fn can_cancel_order(&self, order_id: &OrderId, amount: Option<Decimal>) -> Result<bool> {
        let order = self.store.get_order(order_id).await?;
        Ok(self.can_cancel(&order, amount).await)
    }

    pub async fn can_refund_order(&self, order_id: &OrderId, amount: Option<Decimal>) -> Result<bool> {
        let order = self.store.get_order(order_id).await?;
        Ok(self.can_refund(&order, amount).await)
    }

    async fn remaining_allows(&self, order: &Order, kind: RemainingKind) -> bool {
        let Some(resource_id) = order.resource_id() else {
            debug!(order_id = %order.order_id, ?kind, "No gateway resource id, action denied");
            return false;
        };

        match self.gateway.fetch_payment_info(resource_id).await {
            Ok(info) => info
                .remaining(kind)
                .is_some_and(|remaining| remaining > ELIGIBILITY_THRESHOLD),
            Err(e) => {
                debug!(order_id = %order.order_id, ?kind, error = %e, "Failed to fetch payment info, action denied");
                false
            }
        }
    }
}
