//! Recovery of orders that were marked failed while the gateway still went on to authorize them.

use crate::application::engine::PaymentEngine;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::transaction::TransactionType;
use crate::error::Result;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was not in the failed state; nothing was polled.
    NotFailed,
    Resolved { transaction_number: u64, attempts: u32 },
    /// No completed authorization showed up; the order stays failed.
    Exhausted { attempts: u32 },
    Cancelled,
}

impl PaymentEngine {
    /// Polls the gateway until a completed authorization or sale appears for a failed order.
    ///
    /// Runs at most `max_attempts` attempts, each preceded by a `poll_interval` wait that is
    /// interrupted when `shutdown` turns `true`. Errors inside an attempt are logged and polling
    /// continues; only loading the order can fail the call.
    pub async fn reconcile_failed_order(
        &self,
        order_id: &OrderId,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ReconcileOutcome> {
        let order = self.store.get_order(order_id).await?;
        if order.status != OrderStatus::Failed {
            debug!(order_id = %order_id, status = %order.status, "Order is not failed, nothing to reconcile");
            return Ok(ReconcileOutcome::NotFailed);
        }

        let config = self.reconcile_config();
        for attempt in 1..=config.max_attempts {
            if self.wait_or_shutdown(config.poll_interval, &mut shutdown).await {
                info!(order_id = %order_id, attempt, "Reconciliation cancelled");
                return Ok(ReconcileOutcome::Cancelled);
            }

            match self.poll_failed_order(&order).await {
                Ok(Some(transaction_number)) => {
                    info!(order_id = %order_id, transaction_number, attempt, "Failed order reconciled");
                    return Ok(ReconcileOutcome::Resolved {
                        transaction_number,
                        attempts: attempt,
                    });
                }
                Ok(None) => debug!(order_id = %order_id, attempt, "No completed authorization yet"),
                Err(e) => warn!(order_id = %order_id, attempt, error = %e, "Reconciliation attempt failed"),
            }
        }

        info!(order_id = %order_id, attempts = config.max_attempts, "Reconciliation gave up, order stays failed");
        Ok(ReconcileOutcome::Exhausted {
            attempts: config.max_attempts,
        })
    }

    /// [`PaymentEngine::reconcile_failed_order`] without an external shutdown signal.
    pub async fn resolve_failed_order(&self, order_id: &OrderId) -> Result<ReconcileOutcome> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.reconcile_failed_order(order_id, shutdown_rx).await
    }

    /// Returns `true` when shutdown was requested before the interval elapsed.
    ///
    /// The interval is a single sleep; watch updates that keep the flag `false` do not restart it.
    async fn wait_or_shutdown(&self, interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        if *shutdown.borrow_and_update() {
            return true;
        }

        let sleep = self.clock.sleep(interval);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can cancel any more.
                        sleep.await;
                        return false;
                    }
                    if *shutdown.borrow_and_update() {
                        return true;
                    }
                }
            }
        }
    }

    async fn poll_failed_order(&self, order: &Order) -> Result<Option<u64>> {
        let payment_id = self.resolve_payment_id(order).await?;
        let transactions = self.gateway.fetch_transactions_list(&payment_id).await?;

        for transaction in transactions
            .iter()
            .filter(|tx| matches!(tx.r#type, TransactionType::Authorization | TransactionType::Sale))
        {
            if transaction.is_failed() {
                warn!(
                    order_id = %order.order_id,
                    transaction = transaction.number,
                    reason = %transaction.failed_details(),
                    "Authorization is failed"
                );
                continue;
            }

            if transaction.is_completed() {
                self.store
                    .set_payment_id(&order.order_id, payment_id.clone())
                    .await?;
                self.fetch_transactions_and_update_order(&order.order_id, Some(transaction.number))
                    .await?;
                return Ok(Some(transaction.number));
            }
        }

        Ok(None)
    }
}
