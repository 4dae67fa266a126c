use crate::domain::gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("{0}")]
    ActionUnavailable(String),
    #[error("{0}")]
    ResourceUnavailable(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Unknown transaction type: {0}")]
    UnknownTransactionType(String),
    #[error("Partial cancellation isn't available.")]
    PartialCancellationUnavailable,
    #[error("{0}")]
    TransactionFailed(String),
    #[error("Aborting is failed. Payment state: {0}")]
    AbortFailed(String),
    #[error("Failed to fetch transaction number #{0}")]
    TransactionNotFound(u64),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl PaymentError {
    /// HTTP status reported by the gateway, when the error came from it.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PaymentError::Gateway(e) => e.status_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
