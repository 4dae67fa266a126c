use crate::application::executor::ExecutionContext;
use crate::config::ReconcileConfig;
use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ClockBox, GatewayClient, GatewayClientBox, OrderStore, OrderStoreBox};
use crate::error::{PaymentError, Result};

/// The main entry point for reconciling orders with the payment gateway.
///
/// `PaymentEngine` owns the gateway client, the order store and the clock, and exposes the
/// eligibility checks, the capture/cancel/refund/abort actions, transaction processing and the
/// failed-order reconciliation loop. Every operation is awaited to completion before the next
/// one starts; the engine never spawns work of its own.
pub struct PaymentEngine {
    pub(crate) gateway: GatewayClientBox,
    pub(crate) store: OrderStoreBox,
    pub(crate) clock: ClockBox,
    reconcile: ReconcileConfig,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` with the default reconciliation bounds.
    ///
    /// # Arguments
    ///
    /// * `gateway` - Client for the remote payment gateway.
    /// * `store` - The platform's order persistence.
    /// * `clock` - Source of delays for the reconciliation loop.
    pub fn new(gateway: GatewayClientBox, store: OrderStoreBox, clock: ClockBox) -> Self {
        Self {
            gateway,
            store,
            clock,
            reconcile: ReconcileConfig::default(),
        }
    }

    pub fn with_reconcile_config(mut self, config: ReconcileConfig) -> Self {
        self.reconcile = config;
        self
    }

    pub fn reconcile_config(&self) -> ReconcileConfig {
        self.reconcile
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        self.store.get_order(order_id).await
    }

    pub(crate) fn context(&self) -> ExecutionContext<'_> {
        ExecutionContext {
            gateway: self.gateway.as_ref(),
            store: self.store.as_ref(),
        }
    }

    /// Payment that carries the order's transactions.
    ///
    /// Checkout orders only know their payment order, so the payment is looked up through the
    /// payment order's current payment on every call.
    pub(crate) async fn resolve_payment_id(&self, order: &Order) -> Result<String> {
        let payment_id = if order.payment_method.is_checkout() {
            match order.resource_id() {
                Some(payment_order_id) => {
                    self.gateway
                        .payment_id_by_payment_order(payment_order_id)
                        .await?
                }
                None => None,
            }
        } else {
            order.resource_id().map(str::to_string)
        };

        payment_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::ResourceUnavailable("Unable to get payment ID".to_string()))
    }
}
