use crate::application::engine::PaymentEngine;
use crate::application::executor::{
    ActionAmounts, CheckoutExecutor, DirectExecutor, Executor, InvoiceExecutor, PaymentExecutor,
};
use crate::domain::gateway::GatewayError;
use crate::domain::order::{Order, OrderId, OrderStatus, PaymentMethod};
use crate::domain::transaction::Transaction;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// A mutating action whose outcome is reported as a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Capture,
    Cancel,
    Refund,
}

impl Action {
    /// Key of the object wrapping the transaction in the gateway's response.
    pub fn response_key(self) -> &'static str {
        match self {
            Action::Capture => "capture",
            Action::Cancel => "cancellation",
            Action::Refund => "reversal",
        }
    }

    fn unavailable_message(self) -> &'static str {
        match self {
            Action::Capture => "Capturing is not available.",
            Action::Cancel => "Cancellation is not available.",
            Action::Refund => "Refund action is not available.",
        }
    }
}

/// Result of a dispatched action: the echoed transaction, if any, and the raw gateway response.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub transaction: Option<Transaction>,
    pub raw: Value,
}

fn echoed_transaction(action: Action, raw: &Value) -> Result<Transaction> {
    let payload = raw
        .get(action.response_key())
        .and_then(|wrapper| wrapper.get("transaction"))
        .ok_or_else(|| {
            GatewayError::InvalidResponse(format!("missing {}.transaction", action.response_key()))
        })?;
    Ok(Transaction::deserialize(payload).map_err(GatewayError::from)?)
}

impl PaymentEngine {
    pub async fn capture(
        &self,
        order_id: &OrderId,
        amount: Option<Decimal>,
        vat_amount: Option<Decimal>,
    ) -> Result<ActionResponse> {
        self.dispatch(order_id, Action::Capture, amount, vat_amount).await
    }

    /// Cancels the whole authorization. Partial cancellations are rejected before the gateway
    /// is contacted.
    pub async fn cancel(
        &self,
        order_id: &OrderId,
        amount: Option<Decimal>,
        vat_amount: Option<Decimal>,
    ) -> Result<ActionResponse> {
        self.dispatch(order_id, Action::Cancel, amount, vat_amount).await
    }

    pub async fn refund(
        &self,
        order_id: &OrderId,
        amount: Option<Decimal>,
        vat_amount: Option<Decimal>,
    ) -> Result<ActionResponse> {
        self.dispatch(order_id, Action::Refund, amount, vat_amount).await
    }

    /// Aborts a payment the payer has not completed.
    pub async fn abort(&self, order_id: &OrderId) -> Result<ActionResponse> {
        let order = self.store.get_order(order_id).await?;
        let executor = self.select_executor(&order).await?;
        let raw = executor.abort(&self.context(), &order).await?;

        let state = raw
            .get(executor.resource_kind().response_key())
            .and_then(|resource| resource.get("state"))
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        if state != "Aborted" {
            return Err(PaymentError::AbortFailed(state));
        }

        info!(order_id = %order_id, "Payment aborted");
        self.update_order_status(
            order_id,
            OrderStatus::Cancelled,
            Some("Payment aborted".to_string()),
            None,
        )
        .await?;

        Ok(ActionResponse {
            transaction: None,
            raw,
        })
    }

    async fn dispatch(
        &self,
        order_id: &OrderId,
        action: Action,
        amount: Option<Decimal>,
        vat_amount: Option<Decimal>,
    ) -> Result<ActionResponse> {
        let order = self.store.get_order(order_id).await?;

        if action == Action::Cancel {
            let partial_amount = amount.is_some_and(|a| !a.is_zero() && a != order.amount);
            let partial_vat = vat_amount.is_some_and(|v| !v.is_zero() && v != order.vat_amount);
            if partial_amount || partial_vat {
                return Err(PaymentError::PartialCancellationUnavailable);
            }
        }

        let amounts = ActionAmounts::resolve(&order, amount, vat_amount);
        let allowed = match action {
            Action::Capture => self.can_capture(&order, Some(amounts.amount)).await,
            Action::Cancel => self.can_cancel(&order, Some(amounts.amount)).await,
            Action::Refund => self.can_refund(&order, Some(amounts.amount)).await,
        };
        if !allowed {
            debug!(order_id = %order_id, ?action, "Action denied by eligibility gate");
            return Err(PaymentError::ActionUnavailable(
                action.unavailable_message().to_string(),
            ));
        }

        let executor = self.select_executor(&order).await?;
        let ctx = self.context();
        let raw = match action {
            Action::Capture => executor.capture(&ctx, &order, amounts).await?,
            Action::Cancel => executor.cancel(&ctx, &order, amounts).await?,
            Action::Refund => executor.refund(&ctx, &order, amounts).await?,
        };

        let transaction = echoed_transaction(action, &raw)?;
        self.store.save_transaction(order_id, &transaction).await?;
        self.apply_action_result(&order, action, &transaction).await?;

        Ok(ActionResponse {
            transaction: Some(transaction),
            raw,
        })
    }

    async fn select_executor(&self, order: &Order) -> Result<Executor> {
        if order.payment_method.is_checkout() {
            let payment_order_id = order.resource_id().ok_or_else(|| {
                PaymentError::ResourceUnavailable("Unable to get payment order ID".to_string())
            })?;
            return Ok(Executor::Checkout(CheckoutExecutor::new(payment_order_id)));
        }

        let payment_id = order
            .resource_id()
            .ok_or_else(|| PaymentError::ResourceUnavailable("Unable to get payment ID".to_string()))?;
        let info = self.gateway.fetch_payment_info(payment_id).await?;

        if info.is_invoice() || order.payment_method == PaymentMethod::Invoice {
            Ok(Executor::Invoice(InvoiceExecutor::new(info)))
        } else {
            Ok(Executor::Direct(DirectExecutor::new(
                order.payment_method,
                payment_id,
                info,
            )))
        }
    }
}
