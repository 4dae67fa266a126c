use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::OrderStore;
use crate::domain::transaction::{PaymentToken, Transaction, TransactionLookup};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One applied status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub message: Option<String>,
    pub transaction_number: Option<u64>,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    notes: HashMap<OrderId, Vec<String>>,
    history: HashMap<OrderId, Vec<StatusChange>>,
    transactions: HashMap<u64, (OrderId, Transaction)>,
    tokens: Vec<PaymentToken>,
    payee_sequences: HashMap<OrderId, u64>,
}

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<..>>` so clones share the same orders. Besides the `OrderStore` port it keeps
/// the note stream and the history of applied status writes for inspection.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an order.
    pub async fn insert_order(&self, order: Order) {
        let mut state = self.state.write().await;
        state.orders.insert(order.order_id.clone(), order);
    }

    pub async fn orders(&self) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        orders
    }

    pub async fn notes(&self, order_id: &OrderId) -> Vec<String> {
        let state = self.state.read().await;
        state.notes.get(order_id).cloned().unwrap_or_default()
    }

    pub async fn status_history(&self, order_id: &OrderId) -> Vec<StatusChange> {
        let state = self.state.read().await;
        state.history.get(order_id).cloned().unwrap_or_default()
    }

    /// Saved transactions of an order, ordered by transaction number.
    pub async fn transactions(&self, order_id: &OrderId) -> Vec<Transaction> {
        let state = self.state.read().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|(owner, _)| owner == order_id)
            .map(|(_, tx)| tx.clone())
            .collect();
        transactions.sort_by_key(|tx| tx.number);
        transactions
    }

    pub async fn tokens(&self) -> Vec<PaymentToken> {
        self.state.read().await.tokens.clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        let state = self.state.read().await;
        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))
    }

    async fn can_update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        _transaction_number: Option<u64>,
    ) -> Result<bool> {
        let order = self.get_order(order_id).await?;
        Ok(order.status.can_transition_to(status))
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        message: Option<String>,
        transaction_number: Option<u64>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        order.status = status;

        if let Some(message) = &message {
            state
                .notes
                .entry(order_id.clone())
                .or_default()
                .push(message.clone());
        }
        state
            .history
            .entry(order_id.clone())
            .or_default()
            .push(StatusChange {
                status,
                message,
                transaction_number,
            });
        Ok(())
    }

    async fn add_order_note(&self, order_id: &OrderId, message: String) -> Result<()> {
        let mut state = self.state.write().await;
        state.notes.entry(order_id.clone()).or_default().push(message);
        Ok(())
    }

    async fn set_payment_id(&self, order_id: &OrderId, payment_id: String) -> Result<()> {
        let mut state = self.state.write().await;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        order.payment_id = Some(payment_id);
        Ok(())
    }

    async fn save_payment_token(&self, token: PaymentToken) -> Result<()> {
        let mut state = self.state.write().await;
        state.tokens.push(token);
        Ok(())
    }

    async fn save_transaction(&self, order_id: &OrderId, transaction: &Transaction) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .transactions
            .insert(transaction.number, (order_id.clone(), transaction.clone()));
        Ok(())
    }

    async fn find_transaction(&self, lookup: TransactionLookup) -> Result<Option<Transaction>> {
        let state = self.state.read().await;
        let found = match &lookup {
            TransactionLookup::Number(number) => state.transactions.get(number).map(|(_, tx)| tx),
            TransactionLookup::Id(_) => state
                .transactions
                .values()
                .map(|(_, tx)| tx)
                .find(|tx| lookup.matches(tx)),
        };
        Ok(found.cloned())
    }

    async fn generate_payee_reference(&self, order_id: &OrderId) -> Result<String> {
        let mut state = self.state.write().await;
        let sequence = state.payee_sequences.entry(order_id.clone()).or_default();
        *sequence += 1;
        Ok(order_id.payee_reference(*sequence))
    }
}
