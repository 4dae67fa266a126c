//! Per-instrument request builders for capture, cancel, refund and abort.

use crate::domain::gateway::HttpMethod;
use crate::domain::money::to_minor_units;
use crate::domain::order::{Order, PaymentMethod};
use crate::domain::payment::{PaymentInfo, ResourceKind};
use crate::domain::ports::{GatewayClient, OrderStore};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use tracing::debug;

const INVOICE_ACTIVITY: &str = "FinancingConsumer";
const ABORT_REASON: &str = "CancelledByConsumer";

/// Ports an executor may use while building and sending a request.
pub struct ExecutionContext<'a> {
    pub gateway: &'a dyn GatewayClient,
    pub store: &'a dyn OrderStore,
}

/// Amounts of a single action, in major units, after defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionAmounts {
    pub amount: Decimal,
    pub vat_amount: Decimal,
}

impl ActionAmounts {
    /// A missing or zero amount means the whole order. An explicit amount without vat means zero vat.
    pub fn resolve(order: &Order, amount: Option<Decimal>, vat_amount: Option<Decimal>) -> Self {
        match amount.filter(|a| !a.is_zero()) {
            Some(amount) => Self {
                amount,
                vat_amount: vat_amount.unwrap_or(Decimal::ZERO),
            },
            None => Self {
                amount: order.amount,
                vat_amount: order.vat_amount,
            },
        }
    }

    pub fn covers_order(&self, order: &Order) -> bool {
        self.amount == order.amount
    }
}

/// Issues the mutating gateway requests for one kind of payment instrument.
///
/// Each method returns the raw gateway response; interpreting it is left to the caller.
#[async_trait]
pub trait PaymentExecutor: Send + Sync {
    async fn capture(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value>;

    async fn cancel(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value>;

    async fn refund(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value>;

    async fn abort(&self, ctx: &ExecutionContext<'_>, order: &Order) -> Result<Value>;
}

fn description(action: &str, order: &Order) -> String {
    format!("{action} for Order #{}", order.order_id)
}

fn order_items(order: &Order) -> Result<Value> {
    serde_json::to_value(&order.items).map_err(|e| PaymentError::InternalError(Box::new(e)))
}

fn abort_body(kind: ResourceKind) -> Value {
    let key = match kind {
        ResourceKind::Payment => "payment",
        ResourceKind::PaymentOrder => "paymentorder",
    };
    let mut body = Map::new();
    body.insert(
        key.to_string(),
        json!({"operation": "Abort", "abortReason": ABORT_REASON}),
    );
    Value::Object(body)
}

async fn send_abort(ctx: &ExecutionContext<'_>, info: &PaymentInfo, rel: &str) -> Result<Value> {
    let href = info
        .operation_by_rel(rel)
        .ok_or_else(|| PaymentError::ResourceUnavailable("Abort is unavailable".to_string()))?;
    Ok(ctx
        .gateway
        .request(HttpMethod::Patch, href, Some(abort_body(info.kind)))
        .await?)
}

/// Checkout orders: every action targets the payment order and carries the order lines.
#[derive(Debug, Clone)]
pub struct CheckoutExecutor {
    payment_order_id: String,
}

impl CheckoutExecutor {
    pub fn new(payment_order_id: impl Into<String>) -> Self {
        Self {
            payment_order_id: payment_order_id.into(),
        }
    }
}

#[async_trait]
impl PaymentExecutor for CheckoutExecutor {
    async fn capture(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let mut transaction = json!({
            "description": description("Capture", order),
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        });
        if amounts.covers_order(order) {
            transaction["orderItems"] = order_items(order)?;
        }

        let url = format!("{}/captures", self.payment_order_id);
        debug!(order_id = %order.order_id, %url, "Checkout capture");
        Ok(ctx
            .gateway
            .request(HttpMethod::Post, &url, Some(json!({"transaction": transaction})))
            .await?)
    }

    async fn cancel(&self, ctx: &ExecutionContext<'_>, order: &Order, _amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "description": description("Cancellation", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});

        let url = format!("{}/cancellations", self.payment_order_id);
        debug!(order_id = %order.order_id, %url, "Checkout cancellation");
        Ok(ctx.gateway.request(HttpMethod::Post, &url, Some(body)).await?)
    }

    async fn refund(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let payee_reference = ctx.store.generate_payee_reference(&order.order_id).await?;
        let mut transaction = json!({
            "description": description("Refund", order),
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "receiptReference": format!("{payee_reference}r"),
            "payeeReference": payee_reference,
        });
        if amounts.covers_order(order) {
            transaction["orderItems"] = order_items(order)?;
        }

        let url = format!("{}/reversals", self.payment_order_id);
        debug!(order_id = %order.order_id, %url, "Checkout reversal");
        Ok(ctx
            .gateway
            .request(HttpMethod::Post, &url, Some(json!({"transaction": transaction})))
            .await?)
    }

    async fn abort(&self, ctx: &ExecutionContext<'_>, _order: &Order) -> Result<Value> {
        let info = ctx.gateway.fetch_payment_info(&self.payment_order_id).await?;
        send_abort(ctx, &info, "update-paymentorder-abort").await
    }
}

/// Card, MobilePay, Swish, Trustly and Vipps payments: actions are posted straight to the payment.
#[derive(Debug, Clone)]
pub struct DirectExecutor {
    method: PaymentMethod,
    payment_id: String,
    info: PaymentInfo,
}

impl DirectExecutor {
    pub fn new(method: PaymentMethod, payment_id: impl Into<String>, info: PaymentInfo) -> Self {
        Self {
            method,
            payment_id: payment_id.into(),
            info,
        }
    }

    async fn post(&self, ctx: &ExecutionContext<'_>, order: &Order, resource: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{resource}", self.payment_id);
        debug!(order_id = %order.order_id, method = %self.method, %url, "Direct payment request");
        Ok(ctx.gateway.request(HttpMethod::Post, &url, Some(body)).await?)
    }
}

#[async_trait]
impl PaymentExecutor for DirectExecutor {
    async fn capture(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "description": description("Capture", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "captures", body).await
    }

    async fn cancel(&self, ctx: &ExecutionContext<'_>, order: &Order, _amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "description": description("Cancellation", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "cancellations", body).await
    }

    async fn refund(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "description": description("Refund", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "reversals", body).await
    }

    async fn abort(&self, ctx: &ExecutionContext<'_>, _order: &Order) -> Result<Value> {
        send_abort(ctx, &self.info, "update-payment-abort").await
    }
}

/// Invoice payments: actions follow the operation links the gateway advertises.
#[derive(Debug, Clone)]
pub struct InvoiceExecutor {
    info: PaymentInfo,
}

impl InvoiceExecutor {
    pub fn new(info: PaymentInfo) -> Self {
        Self { info }
    }

    async fn post(&self, ctx: &ExecutionContext<'_>, order: &Order, rel: &str, unavailable: &str, body: Value) -> Result<Value> {
        let href = self
            .info
            .operation_by_rel(rel)
            .ok_or_else(|| PaymentError::ResourceUnavailable(unavailable.to_string()))?;
        debug!(order_id = %order.order_id, rel, href, "Invoice request");
        Ok(ctx.gateway.request(HttpMethod::Post, href, Some(body)).await?)
    }
}

#[async_trait]
impl PaymentExecutor for InvoiceExecutor {
    async fn capture(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "activity": INVOICE_ACTIVITY,
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "description": description("Capture", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "create-capture", "Capture is unavailable", body).await
    }

    async fn cancel(&self, ctx: &ExecutionContext<'_>, order: &Order, _amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "activity": INVOICE_ACTIVITY,
            "description": description("Cancellation", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "create-cancellation", "Cancellation is unavailable", body).await
    }

    async fn refund(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        let body = json!({"transaction": {
            "activity": INVOICE_ACTIVITY,
            "amount": to_minor_units(amounts.amount)?,
            "vatAmount": to_minor_units(amounts.vat_amount)?,
            "description": description("Refund", order),
            "payeeReference": ctx.store.generate_payee_reference(&order.order_id).await?,
        }});
        self.post(ctx, order, "create-reversal", "Refund is unavailable", body).await
    }

    async fn abort(&self, ctx: &ExecutionContext<'_>, _order: &Order) -> Result<Value> {
        send_abort(ctx, &self.info, "update-payment-abort").await
    }
}

/// The executor selected for an order.
#[derive(Debug, Clone)]
pub enum Executor {
    Checkout(CheckoutExecutor),
    Direct(DirectExecutor),
    Invoice(InvoiceExecutor),
}

impl Executor {
    /// Resource whose `state` reports the outcome of an abort.
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Executor::Checkout(_) => ResourceKind::PaymentOrder,
            Executor::Direct(_) | Executor::Invoice(_) => ResourceKind::Payment,
        }
    }

    fn inner(&self) -> &dyn PaymentExecutor {
        match self {
            Executor::Checkout(executor) => executor,
            Executor::Direct(executor) => executor,
            Executor::Invoice(executor) => executor,
        }
    }
}

#[async_trait]
impl PaymentExecutor for Executor {
    async fn capture(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        self.inner().capture(ctx, order, amounts).await
    }

    async fn cancel(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        self.inner().cancel(ctx, order, amounts).await
    }

    async fn refund(&self, ctx: &ExecutionContext<'_>, order: &Order, amounts: ActionAmounts) -> Result<Value> {
        self.inner().refund(ctx, order, amounts).await
    }

    async fn abort(&self, ctx: &ExecutionContext<'_>, order: &Order) -> Result<Value> {
        self.inner().abort(ctx, order).await
    }
}
