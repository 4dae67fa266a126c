use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const PAYEE_REFERENCE_MAX_LEN: usize = 30;

/// Merchant-side identifier of an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payee reference for the `sequence`-th request of this order.
    ///
    /// The gateway only accepts alphanumeric references of at most 30 characters and rejects
    /// reused ones, so the order id is stripped and suffixed with the sequence number.
    pub fn payee_reference(&self, sequence: u64) -> String {
        let suffix = format!("x{sequence}");
        let prefix: String = self
            .0
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(PAYEE_REFERENCE_MAX_LEN.saturating_sub(suffix.len()))
            .collect();
        format!("{prefix}{suffix}")
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Authorized,
    Captured,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    /// Default transition policy used by the bundled order stores.
    ///
    /// | From \ To  | authorized | captured | cancelled | refunded | failed |
    /// |------------|------------|----------|-----------|----------|--------|
    /// | new        | yes        | yes      | yes       | no       | yes    |
    /// | authorized | -          | yes      | yes       | no       | yes    |
    /// | captured   | no         | -        | no        | yes      | yes    |
    /// | failed     | yes        | yes      | yes       | no       | -      |
    /// | cancelled  | no         | no       | -         | no       | no     |
    /// | refunded   | no         | no       | no        | -        | no     |
    ///
    /// Nothing ever transitions back to `new`.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (current, next) if current == next => false,
            (New, Authorized | Captured | Cancelled | Failed) => true,
            (Authorized, Captured | Cancelled | Failed) => true,
            (Captured, Refunded | Failed) => true,
            (Failed, Authorized | Captured | Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Authorized => "authorized",
            OrderStatus::Captured => "captured",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Checkout,
    #[serde(alias = "cc")]
    Card,
    Invoice,
    Mobilepay,
    Swish,
    Trustly,
    Vipps,
}

impl PaymentMethod {
    pub fn is_checkout(self) -> bool {
        self == PaymentMethod::Checkout
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            PaymentMethod::Checkout => "checkout",
            PaymentMethod::Card => "card",
            PaymentMethod::Invoice => "invoice",
            PaymentMethod::Mobilepay => "mobilepay",
            PaymentMethod::Swish => "swish",
            PaymentMethod::Trustly => "trustly",
            PaymentMethod::Vipps => "vipps",
        };
        f.write_str(tag)
    }
}

/// A single order line. Monetary fields are in minor units, as the gateway expects them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub reference: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "class")]
    pub item_class: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub quantity_unit: String,
    pub unit_price: i64,
    pub vat_percent: i64,
    pub amount: i64,
    pub vat_amount: i64,
}

/// The order aggregate as seen by the reconciliation engine.
///
/// Exactly one of `payment_id` / `payment_order_id` is authoritative: the payment order for
/// [`PaymentMethod::Checkout`], the payment for every other method.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub currency: String,
    /// Gross amount in major units.
    pub amount: Decimal,
    pub vat_amount: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_order_id: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub needs_save_token: bool,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        currency: impl Into<String>,
        amount: Decimal,
        vat_amount: Decimal,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            order_id: OrderId::new(order_id),
            currency: currency.into(),
            amount,
            vat_amount,
            items: Vec::new(),
            payment_method,
            payment_id: None,
            payment_order_id: None,
            status: OrderStatus::New,
            customer_id: None,
            needs_save_token: false,
        }
    }

    /// The gateway resource that carries this order's remaining-amount counters.
    pub fn resource_id(&self) -> Option<&str> {
        if self.payment_method.is_checkout() {
            self.payment_order_id.as_deref()
        } else {
            self.payment_id.as_deref()
        }
        .filter(|id| !id.is_empty())
    }
}
