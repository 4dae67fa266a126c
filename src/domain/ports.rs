use super::gateway::{GatewayError, HttpMethod};
use super::order::{Order, OrderId, OrderStatus};
use super::payment::PaymentInfo;
use super::transaction::{PaymentToken, TokenEntry, Transaction, TransactionLookup};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

type GatewayResult<T> = std::result::Result<T, GatewayError>;

fn extract_list<T: DeserializeOwned>(
    value: &Value,
    container: &str,
    list: &str,
) -> GatewayResult<Vec<T>> {
    let items = value
        .get(container)
        .and_then(|c| c.get(list))
        .ok_or_else(|| GatewayError::InvalidResponse(format!("missing {container}.{list}")))?;
    Ok(Vec::<T>::deserialize(items)?)
}

/// Access to the remote payment gateway.
///
/// Implementors only provide [`GatewayClient::request`]; the typed fetches are built on top of it.
/// `path_or_url` is either an absolute operation href or a resource id such as
/// `/psp/creditcard/payments/{id}`.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        path_or_url: &str,
        body: Option<Value>,
    ) -> GatewayResult<Value>;

    async fn fetch_payment_info(&self, id: &str) -> GatewayResult<PaymentInfo> {
        let value = self.request(HttpMethod::Get, id, None).await?;
        PaymentInfo::from_value(&value)
    }

    async fn fetch_transactions_list(&self, payment_id: &str) -> GatewayResult<Vec<Transaction>> {
        let value = self
            .request(HttpMethod::Get, &format!("{payment_id}/transactions"), None)
            .await?;
        extract_list(&value, "transactions", "transactionList")
    }

    async fn fetch_verification_list(&self, payment_id: &str) -> GatewayResult<Vec<TokenEntry>> {
        let value = self
            .request(HttpMethod::Get, &format!("{payment_id}/verifications"), None)
            .await?;
        extract_list(&value, "verifications", "verificationList")
    }

    async fn fetch_authorization_list(&self, payment_id: &str) -> GatewayResult<Vec<TokenEntry>> {
        let value = self
            .request(HttpMethod::Get, &format!("{payment_id}/authorizations"), None)
            .await?;
        extract_list(&value, "authorizations", "authorizationList")
    }

    /// Follows `paymentOrder.currentPayment` to the underlying payment id.
    ///
    /// Returns `None` while the payer has not started a payment yet.
    async fn payment_id_by_payment_order(&self, payment_order_id: &str) -> GatewayResult<Option<String>> {
        let info = self.fetch_payment_info(payment_order_id).await?;
        let Some(link) = info.resource.current_payment else {
            return Ok(None);
        };

        let current = self.request(HttpMethod::Get, &link.id, None).await?;
        Ok(current
            .get("payment")
            .and_then(|payment| payment.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Order persistence owned by the e-commerce platform.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: &OrderId) -> Result<Order>;

    /// Whether moving the order to `status` is currently valid.
    async fn can_update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        transaction_number: Option<u64>,
    ) -> Result<bool>;

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        message: Option<String>,
        transaction_number: Option<u64>,
    ) -> Result<()>;

    async fn add_order_note(&self, order_id: &OrderId, message: String) -> Result<()>;

    async fn set_payment_id(&self, order_id: &OrderId, payment_id: String) -> Result<()>;

    async fn save_payment_token(&self, token: PaymentToken) -> Result<()>;

    async fn save_transaction(&self, order_id: &OrderId, transaction: &Transaction) -> Result<()>;

    async fn save_transactions(&self, order_id: &OrderId, transactions: &[Transaction]) -> Result<()> {
        for transaction in transactions {
            self.save_transaction(order_id, transaction).await?;
        }
        Ok(())
    }

    async fn find_transaction(&self, lookup: TransactionLookup) -> Result<Option<Transaction>>;

    async fn generate_payee_reference(&self, order_id: &OrderId) -> Result<String>;
}

/// Source of delays for polling loops.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type GatewayClientBox = Box<dyn GatewayClient>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type ClockBox = Box<dyn Clock>;
