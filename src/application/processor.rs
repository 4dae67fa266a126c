use crate::application::dispatcher::Action;
use crate::application::engine::PaymentEngine;
use crate::domain::money::eq_to_cents;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::payment::RemainingKind;
use crate::domain::transaction::{
    PaymentToken, TokenEntry, Transaction, TransactionLookup, TransactionState, TransactionType,
};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

/// Outcome of a batch run of [`PaymentEngine::fetch_transactions_and_update_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingSummary {
    pub processed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum TokenSource {
    Verification,
    Authorization,
}

fn failure_message(transaction: &Transaction, default: &str) -> String {
    transaction
        .failed_reason
        .clone()
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl PaymentEngine {
    /// Applies a transaction reported by the gateway to its order.
    ///
    /// Status changes go through [`PaymentEngine::update_order_status`], so replaying a
    /// transaction whose status is already current is a no-op.
    pub async fn process_transaction(&self, order_id: &OrderId, transaction: &Transaction) -> Result<()> {
        let order = self.store.get_order(order_id).await?;
        let number = Some(transaction.number);
        let details = transaction.failed_details();

        match &transaction.r#type {
            TransactionType::Verification => match &transaction.state {
                TransactionState::Failed => {
                    self.store
                        .add_order_note(
                            order_id,
                            format!("Verification has been failed. Reason: {details}."),
                        )
                        .await
                }
                state if state.is_pending() => {
                    self.store
                        .add_order_note(order_id, "Verification transaction is pending.".to_string())
                        .await
                }
                TransactionState::Completed => self.save_card(&order, TokenSource::Verification).await,
                other => {
                    debug!(order_id = %order_id, state = %other, "Ignoring verification state");
                    Ok(())
                }
            },
            TransactionType::Authorization => match &transaction.state {
                TransactionState::Failed => {
                    let message = format!("Authorization has been failed. Reason: {details}.");
                    self.update_order_status(order_id, OrderStatus::Failed, Some(message), number)
                        .await
                }
                state if state.is_pending() => {
                    self.update_order_status(
                        order_id,
                        OrderStatus::Authorized,
                        Some("Authorization is pending.".to_string()),
                        number,
                    )
                    .await
                }
                TransactionState::Completed => {
                    let message = format!("Payment has been authorized. Transaction: {}", transaction.number);
                    if order.status == OrderStatus::Captured {
                        self.store.add_order_note(order_id, message).await?;
                    } else {
                        self.update_order_status(order_id, OrderStatus::Authorized, Some(message), number)
                            .await?;
                    }

                    if order.needs_save_token {
                        self.save_card(&order, TokenSource::Authorization).await?;
                    }
                    Ok(())
                }
                other => {
                    debug!(order_id = %order_id, state = %other, "Ignoring authorization state");
                    Ok(())
                }
            },
            TransactionType::Capture | TransactionType::Sale => match &transaction.state {
                TransactionState::Failed => {
                    let message = format!("Capture has been failed. Reason: {details}.");
                    self.update_order_status(order_id, OrderStatus::Failed, Some(message), number)
                        .await
                }
                state if state.is_pending() => {
                    self.update_order_status(
                        order_id,
                        OrderStatus::Authorized,
                        Some("Capture is pending.".to_string()),
                        number,
                    )
                    .await
                }
                TransactionState::Completed => {
                    let message = format!("Payment has been captured. Transaction: {}", transaction.number);
                    self.update_order_status(order_id, OrderStatus::Captured, Some(message), number)
                        .await
                }
                other => {
                    debug!(order_id = %order_id, state = %other, "Ignoring capture state");
                    Ok(())
                }
            },
            TransactionType::Cancellation => match &transaction.state {
                TransactionState::Failed => {
                    let message = format!("Cancellation has been failed. Reason: {details}.");
                    self.update_order_status(order_id, OrderStatus::Failed, Some(message), number)
                        .await
                }
                state if state.is_pending() => {
                    self.update_order_status(
                        order_id,
                        OrderStatus::Cancelled,
                        Some("Cancellation is pending.".to_string()),
                        number,
                    )
                    .await
                }
                TransactionState::Completed => {
                    let message = format!("Payment has been cancelled. Transaction: {}", transaction.number);
                    self.update_order_status(order_id, OrderStatus::Cancelled, Some(message), number)
                        .await
                }
                other => {
                    debug!(order_id = %order_id, state = %other, "Ignoring cancellation state");
                    Ok(())
                }
            },
            TransactionType::Reversal => match &transaction.state {
                TransactionState::Failed => {
                    let message = format!("Reversal has been failed. Reason: {details}.");
                    self.update_order_status(order_id, OrderStatus::Failed, Some(message), number)
                        .await
                }
                state if state.is_pending() => {
                    self.update_order_status(
                        order_id,
                        OrderStatus::Refunded,
                        Some("Reversal is pending.".to_string()),
                        number,
                    )
                    .await
                }
                TransactionState::Completed => {
                    let amount = transaction.major_amount();
                    if self.is_full_refund(&order, amount).await? {
                        self.update_order_status(
                            order_id,
                            OrderStatus::Refunded,
                            Some("Payment has been refunded.".to_string()),
                            number,
                        )
                        .await
                    } else {
                        self.store
                            .add_order_note(order_id, format!("Refunded: {amount}."))
                            .await
                    }
                }
                other => {
                    debug!(order_id = %order_id, state = %other, "Ignoring reversal state");
                    Ok(())
                }
            },
            TransactionType::Other(unknown) => Err(PaymentError::UnknownTransactionType(unknown.clone())),
        }
    }

    /// Maps the transaction echoed by a capture, cancel or refund request onto the order.
    pub async fn apply_action_result(&self, order: &Order, action: Action, transaction: &Transaction) -> Result<()> {
        let order_id = &order.order_id;
        let number = Some(transaction.number);
        let state = &transaction.state;

        match action {
            Action::Capture => match state {
                TransactionState::Completed => {
                    let message = format!("Transaction is captured. Amount: {}", transaction.major_amount());
                    self.update_order_status(order_id, OrderStatus::Captured, Some(message), number)
                        .await
                }
                state if state.is_pending() => {
                    self.update_order_status(order_id, OrderStatus::Authorized, None, number)
                        .await
                }
                _ => Err(PaymentError::TransactionFailed(failure_message(
                    transaction,
                    "Capture is failed.",
                ))),
            },
            Action::Cancel => match state {
                TransactionState::Completed | TransactionState::Initialized | TransactionState::AwaitingActivity => {
                    let message = format!("Transaction is cancelled. Transaction state: {state}");
                    self.update_order_status(order_id, OrderStatus::Cancelled, Some(message), number)
                        .await
                }
                _ => Err(PaymentError::TransactionFailed(failure_message(
                    transaction,
                    "Cancellation is failed.",
                ))),
            },
            Action::Refund => match state {
                TransactionState::Completed => {
                    let amount = transaction.major_amount();
                    let message = format!("Refunded: {amount}. Transaction state: {state}");
                    if self.is_full_refund(order, amount).await? {
                        self.update_order_status(order_id, OrderStatus::Refunded, Some(message), number)
                            .await
                    } else {
                        self.store.add_order_note(order_id, message).await
                    }
                }
                state if state.is_pending() => {
                    let message = format!("Refunded: {}. Transaction state: {state}", transaction.major_amount());
                    self.store.add_order_note(order_id, message).await
                }
                _ => Err(PaymentError::TransactionFailed(failure_message(
                    transaction,
                    "Refund is failed.",
                ))),
            },
        }
    }

    /// Whether `refunded` (major units) leaves nothing further to refund on the order.
    ///
    /// Trusts the gateway's remaining reversal counter when it is reported, and otherwise
    /// compares the refunded amount with the order amount to the cent.
    pub async fn is_full_refund(&self, order: &Order, refunded: Decimal) -> Result<bool> {
        let resource_id = order
            .resource_id()
            .ok_or_else(|| PaymentError::ResourceUnavailable("Unable to get payment ID".to_string()))?;
        let info = self.gateway.fetch_payment_info(resource_id).await?;

        Ok(match info.remaining(RemainingKind::Reversal) {
            Some(remaining) => remaining.is_zero(),
            None => eq_to_cents(order.amount, refunded),
        })
    }

    /// Writes `status` only if the store says the transition is currently valid.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        message: Option<String>,
        transaction_number: Option<u64>,
    ) -> Result<()> {
        match self
            .store
            .can_update_order_status(order_id, status, transaction_number)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(order_id = %order_id, %status, ?transaction_number, "Status update not permitted, skipping");
                return Ok(());
            }
            Err(e) => {
                warn!(order_id = %order_id, %status, error = %e, "Unable to validate status update, skipping");
                return Ok(());
            }
        }

        self.store
            .update_order_status(order_id, status, message, transaction_number)
            .await
    }

    /// Pulls the payment's transaction list, stores it and applies it to the order.
    ///
    /// With `transaction_number` only that transaction is applied. A failure on one transaction is
    /// logged and does not stop the rest of the batch.
    pub async fn fetch_transactions_and_update_order(
        &self,
        order_id: &OrderId,
        transaction_number: Option<u64>,
    ) -> Result<ProcessingSummary> {
        let order = self.store.get_order(order_id).await?;
        let payment_id = self.resolve_payment_id(&order).await?;
        let transactions = self.gateway.fetch_transactions_list(&payment_id).await?;
        self.store.save_transactions(order_id, &transactions).await?;

        let selected = match transaction_number {
            Some(number) => {
                let transaction = self
                    .store
                    .find_transaction(TransactionLookup::Number(number))
                    .await?
                    .ok_or(PaymentError::TransactionNotFound(number))?;
                vec![transaction]
            }
            None => transactions,
        };

        let mut summary = ProcessingSummary::default();
        for transaction in &selected {
            match self.process_transaction(order_id, transaction).await {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    error!(order_id = %order_id, transaction = transaction.number, error = %e, "Failed to process transaction");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn save_card(&self, order: &Order, source: TokenSource) -> Result<()> {
        let payment_id = self.resolve_payment_id(order).await?;
        let entries: Vec<TokenEntry> = match source {
            TokenSource::Verification => self.gateway.fetch_verification_list(&payment_id).await?,
            TokenSource::Authorization => self.gateway.fetch_authorization_list(&payment_id).await?,
        };

        let Some(entry) = entries
            .iter()
            .filter(|entry| !entry.transaction.is_failed())
            .find(|entry| entry.has_token())
        else {
            debug!(order_id = %order.order_id, ?source, "No saved card in list");
            return Ok(());
        };

        let token = PaymentToken::from_entry(entry, order.customer_id.clone(), order.order_id.to_string());
        self.store.save_payment_token(token).await?;
        self.store
            .add_order_note(
                &order.order_id,
                format!(
                    "Card {} has been saved.",
                    entry.masked_pan.as_deref().unwrap_or("unknown")
                ),
            )
            .await
    }
}
