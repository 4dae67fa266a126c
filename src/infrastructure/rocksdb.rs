use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::domain::ports::OrderStore;
use crate::domain::transaction::{PaymentToken, Transaction, TransactionLookup};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing each order's note stream.
pub const CF_NOTES: &str = "notes";
/// Column Family for storing gateway transactions, keyed by transaction number.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for storing saved cards.
pub const CF_TOKENS: &str = "tokens";
/// Column Family for storing per-order payee reference counters.
pub const CF_SEQUENCES: &str = "sequences";

#[derive(Serialize, Deserialize)]
struct StoredTransaction {
    order_id: OrderId,
    transaction: Transaction,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

/// A persistent order store implementation using RocksDB.
///
/// Orders, notes, transactions, saved cards and payee reference counters live in separate
/// Column Families. Values are JSON encoded.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbOrderStore {
    db: Arc<DB>,
}

impl RocksDbOrderStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ORDERS, CF_NOTES, CF_TRANSACTIONS, CF_TOKENS, CF_SEQUENCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    /// Inserts or replaces an order.
    pub fn put_order(&self, order: &Order) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        self.db
            .put_cf(cf, order.order_id.as_str().as_bytes(), encode(order)?)?;
        Ok(())
    }

    pub fn find_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        match self.db.get_cf(cf, order_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn notes(&self, order_id: &OrderId) -> Result<Vec<String>> {
        let cf = self.cf(CF_NOTES)?;
        match self.db.get_cf(cf, order_id.as_str().as_bytes())? {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    pub fn tokens(&self) -> Result<Vec<PaymentToken>> {
        let cf = self.cf(CF_TOKENS)?;
        let mut tokens = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            tokens.push(decode(&value)?);
        }
        Ok(tokens)
    }
}

#[async_trait]
impl OrderStore for RocksDbOrderStore {
    async fn get_order(&self, order_id: &OrderId) -> Result<Order> {
        self.find_order(order_id)?
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
        _transaction_number: Option<u64>,
    ) -> Result<()> {
        let mut order = self.get_order(order_id).await?;
        order.status = status;
        self.put_order(&order)?;

        if let Some(message) = message {
            self.add_order_note(order_id, message).await?;
        }
        Ok(())
    }

    async fn add_order_note(&self, order_id: &OrderId, message: String) -> Result<()> {
        let mut notes = self.notes(order_id)?;
        notes.push(message);

        let cf = self.cf(CF_NOTES)?;
        self.db
            .put_cf(cf, order_id.as_str().as_bytes(), encode(&notes)?)?;
        Ok(())
    }

    async fn set_payment_id(&self, order_id: &OrderId, payment_id: String) -> Result<()> {
        let mut order = self.get_order(order_id).await?;
        order.payment_id = Some(payment_id);
        self.put_order(&order)
    }

    async fn save_payment_token(&self, token: PaymentToken) -> Result<()> {
        let key = token
            .payment_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| token.recurrence_token.clone())
            .ok_or_else(|| PaymentError::ValidationError("Payment token without token".to_string()))?;

        let cf = self.cf(CF_TOKENS)?;
        self.db.put_cf(cf, key.as_bytes(), encode(&token)?)?;
        Ok(())
    }

    async fn save_transaction(&self, order_id: &OrderId, transaction: &Transaction) -> Result<()> {
        let stored = StoredTransaction {
            order_id: order_id.clone(),
            transaction: transaction.clone(),
        };

        let cf = self.cf(CF_TRANSACTIONS)?;
        self.db
            .put_cf(cf, transaction.number.to_be_bytes(), encode(&stored)?)?;
        Ok(())
    }

    async fn find_transaction(&self, lookup: TransactionLookup) -> Result<Option<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;

        if let TransactionLookup::Number(number) = lookup {
            return match self.db.get_cf(cf, number.to_be_bytes())? {
                Some(bytes) => Ok(Some(decode::<StoredTransaction>(&bytes)?.transaction)),
                None => Ok(None),
            };
        }

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let stored: StoredTransaction = decode(&value)?;
            if lookup.matches(&stored.transaction) {
                return Ok(Some(stored.transaction));
            }
        }
        Ok(None)
    }

    async fn generate_payee_reference(&self, order_id: &OrderId) -> Result<String> {
        let cf = self.cf(CF_SEQUENCES)?;
        let key = order_id.as_str().as_bytes();

        let current = match self.db.get_cf(cf, key)? {
            Some(bytes) => decode::<u64>(&bytes)?,
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key, encode(&next)?)?;

        Ok(order_id.payee_reference(next))
    }
}
