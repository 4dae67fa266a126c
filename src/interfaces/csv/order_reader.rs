use crate::domain::order::{Order, OrderId, OrderStatus, PaymentMethod};
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Flat CSV shape of an [`Order`]. Order lines are not part of the file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub currency: String,
    pub amount: Decimal,
    pub vat_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub payment_order_id: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub needs_save_token: Option<bool>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Order {
            order_id: OrderId::new(record.order_id),
            currency: record.currency,
            amount: record.amount,
            vat_amount: record.vat_amount,
            items: Vec::new(),
            payment_method: record.payment_method,
            payment_id: record.payment_id,
            payment_order_id: record.payment_order_id,
            status: record.status.unwrap_or_default(),
            customer_id: record.customer_id,
            needs_save_token: record.needs_save_token.unwrap_or(false),
        }
    }
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        OrderRecord {
            order_id: order.order_id.to_string(),
            currency: order.currency.clone(),
            amount: order.amount,
            vat_amount: order.vat_amount,
            payment_method: order.payment_method,
            payment_id: order.payment_id.clone(),
            payment_order_id: order.payment_order_id.clone(),
            status: Some(order.status),
            customer_id: order.customer_id.clone(),
            needs_save_token: Some(order.needs_save_token),
        }
    }
}

/// Reads orders from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Order>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    /// Creates a new `OrderReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes orders.
    pub fn orders(self) -> impl Iterator<Item = Result<Order>> {
        self.reader
            .into_deserialize::<OrderRecord>()
            .map(|result| result.map(Order::from).map_err(PaymentError::from))
    }
}
