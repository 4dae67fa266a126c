#![allow(dead_code)]

use payrecon::application::engine::PaymentEngine;
use payrecon::config::{GatewayConfig, ReconcileConfig};
use payrecon::domain::order::{Order, OrderStatus, PaymentMethod};
use payrecon::infrastructure::clock::TokioClock;
use payrecon::infrastructure::http_gateway::HttpGatewayClient;
use payrecon::infrastructure::in_memory::InMemoryOrderStore;
use payrecon::interfaces::csv::order_writer::OrderWriter;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

pub const PAYMENT_ID: &str = "/psp/creditcard/payments/p1";

/// Card order of 100.00 with 20.00 vat.
pub fn card_order(status: OrderStatus) -> Order {
    let mut order = Order::new("1001", "SEK", dec!(100.00), dec!(20.00), PaymentMethod::Card);
    order.payment_id = Some(PAYMENT_ID.to_string());
    order.status = status;
    order
}

pub async fn engine_for(server_url: &str, order: Order) -> (PaymentEngine, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new();
    store.insert_order(order).await;

    let gateway = HttpGatewayClient::new(&GatewayConfig::new(server_url, "test-token")).unwrap();
    let engine = PaymentEngine::new(Box::new(gateway), Box::new(store.clone()), Box::new(TokioClock))
        .with_reconcile_config(ReconcileConfig {
            max_attempts: 3,
            poll_interval: Duration::from_millis(1),
        });

    (engine, store)
}

pub fn payment_body(remaining: Value) -> String {
    let mut payment = json!({"id": PAYMENT_ID, "instrument": "CreditCard", "state": "Ready"});
    if let (Some(target), Some(extra)) = (payment.as_object_mut(), remaining.as_object()) {
        target.extend(extra.clone());
    }
    json!({"payment": payment, "operations": []}).to_string()
}

pub fn transaction(number: u64, r#type: &str, state: &str, amount: i64) -> Value {
    json!({
        "id": format!("{PAYMENT_ID}/transactions/t{number}"),
        "number": number,
        "type": r#type,
        "state": state,
        "amount": amount,
        "vatAmount": amount / 5,
        "payeeReference": format!("ref{number}")
    })
}

pub fn transactions_body(transactions: Vec<Value>) -> String {
    json!({"transactions": {"id": format!("{PAYMENT_ID}/transactions"), "transactionList": transactions}})
        .to_string()
}

pub fn write_orders_csv(path: &Path, orders: &[Order]) -> Result<(), payrecon::error::PaymentError> {
    let file = File::create(path)?;
    OrderWriter::new(file).write_orders(orders)
}
