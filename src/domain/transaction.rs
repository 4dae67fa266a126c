use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::from_minor_units;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Verification,
    Authorization,
    Capture,
    Sale,
    Cancellation,
    Reversal,
    /// A type this crate does not know about. Kept so the processor can reject it explicitly.
    Other(String),
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Verification" => TransactionType::Verification,
            "Authorization" => TransactionType::Authorization,
            "Capture" => TransactionType::Capture,
            "Sale" => TransactionType::Sale,
            "Cancellation" => TransactionType::Cancellation,
            "Reversal" => TransactionType::Reversal,
            _ => TransactionType::Other(value),
        }
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionType::Verification => "Verification",
            TransactionType::Authorization => "Authorization",
            TransactionType::Capture => "Capture",
            TransactionType::Sale => "Sale",
            TransactionType::Cancellation => "Cancellation",
            TransactionType::Reversal => "Reversal",
            TransactionType::Other(other) => other,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(from = "String", into = "String")]
pub enum TransactionState {
    Initialized,
    AwaitingActivity,
    Completed,
    Failed,
    Other(String),
}

impl TransactionState {
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            TransactionState::Initialized | TransactionState::AwaitingActivity
        )
    }
}

impl From<String> for TransactionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Initialized" => TransactionState::Initialized,
            "AwaitingActivity" => TransactionState::AwaitingActivity,
            "Completed" => TransactionState::Completed,
            "Failed" => TransactionState::Failed,
            _ => TransactionState::Other(value),
        }
    }
}

impl From<TransactionState> for String {
    fn from(value: TransactionState) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionState::Initialized => "Initialized",
            TransactionState::AwaitingActivity => "AwaitingActivity",
            TransactionState::Completed => "Completed",
            TransactionState::Failed => "Failed",
            TransactionState::Other(other) => other,
        })
    }
}

/// A transaction as reported by the gateway. Amounts are in minor units.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<String>,
    pub number: u64,
    #[serde(rename = "type")]
    pub r#type: TransactionType,
    pub state: TransactionState,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub vat_amount: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payee_reference: Option<String>,
    #[serde(default)]
    pub failed_reason: Option<String>,
    #[serde(default)]
    pub failed_activity_name: Option<String>,
    #[serde(default)]
    pub failed_error_code: Option<String>,
    #[serde(default)]
    pub failed_error_description: Option<String>,
}

impl Transaction {
    pub fn is_failed(&self) -> bool {
        self.state == TransactionState::Failed
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn is_completed(&self) -> bool {
        self.state == TransactionState::Completed
    }

    /// Amount in major units.
    pub fn major_amount(&self) -> Decimal {
        from_minor_units(self.amount)
    }

    /// Every failure detail the gateway supplied, joined into one line.
    pub fn failed_details(&self) -> String {
        let details: Vec<&str> = [
            &self.failed_reason,
            &self.failed_activity_name,
            &self.failed_error_code,
            &self.failed_error_description,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .filter(|field| !field.is_empty())
        .collect();

        if details.is_empty() {
            "unknown".to_string()
        } else {
            details.join("; ")
        }
    }
}

/// Entry of a verification or authorization list: card details plus the embedded transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    #[serde(default)]
    pub payment_token: Option<String>,
    #[serde(default)]
    pub recurrence_token: Option<String>,
    #[serde(default)]
    pub card_brand: Option<String>,
    #[serde(default)]
    pub masked_pan: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    pub transaction: Transaction,
}

impl TokenEntry {
    pub fn has_token(&self) -> bool {
        let present = |token: &Option<String>| token.as_deref().is_some_and(|t| !t.is_empty());
        present(&self.payment_token) || present(&self.recurrence_token)
    }
}

/// A saved card, persisted against the customer.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentToken {
    pub customer_id: Option<String>,
    pub payment_token: Option<String>,
    pub recurrence_token: Option<String>,
    pub card_brand: Option<String>,
    pub masked_pan: Option<String>,
    pub expiry_date: Option<String>,
    pub order_id: Option<String>,
}

impl PaymentToken {
    pub fn from_entry(entry: &TokenEntry, customer_id: Option<String>, order_id: String) -> Self {
        Self {
            customer_id,
            payment_token: entry.payment_token.clone(),
            recurrence_token: entry.recurrence_token.clone(),
            card_brand: entry.card_brand.clone(),
            masked_pan: entry.masked_pan.clone(),
            expiry_date: entry.expiry_date.clone(),
            order_id: Some(order_id),
        }
    }
}

/// Key used to look up a previously saved transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLookup {
    Number(u64),
    Id(String),
}

impl TransactionLookup {
    pub fn matches(&self, tx: &Transaction) -> bool {
        match self {
            TransactionLookup::Number(number) => tx.number == *number,
            TransactionLookup::Id(id) => tx.id.as_deref() == Some(id.as_str()),
        }
    }
}
