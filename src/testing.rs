//! In-process doubles shared by the unit tests.

use crate::application::engine::PaymentEngine;
use crate::config::ReconcileConfig;
use crate::domain::gateway::{GatewayError, HttpMethod};
use crate::domain::order::{Order, PaymentMethod};
use crate::domain::ports::{Clock, GatewayClient};
use crate::infrastructure::in_memory::InMemoryOrderStore;
use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PAYMENT_ID: &str = "/psp/creditcard/payments/p1";
pub const PAYMENT_ORDER_ID: &str = "/psp/paymentorders/po1";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Status(u16),
}

/// Gateway double answering from a script keyed by method and path.
///
/// Each key holds a queue of replies; the last reply is sticky. Unscripted requests get a 404.
#[derive(Default, Clone)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: HttpMethod, path: &str, body: Value) -> &Self {
        self.push(method, path, Reply::Json(body));
        self
    }

    pub fn fail(&self, method: HttpMethod, path: &str, status: u16) -> &Self {
        self.push(method, path, Reply::Status(status));
        self
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    /// Number of POST and PATCH requests issued so far.
    pub fn mutating_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method != HttpMethod::Get)
            .count()
    }
}

#[async_trait]
impl GatewayClient for ScriptedGateway {
    async fn request(
        &self,
        method: HttpMethod,
        path_or_url: &str,
        body: Option<Value>,
    ) -> Result<Value, GatewayError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path_or_url.to_string(),
            body,
        });

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&(method, path_or_url.to_string())) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(GatewayError::Http {
                status,
                message: format!("scripted {status}"),
                problem: None,
            }),
            None => Err(GatewayError::Http {
                status: 404,
                message: format!("no script for {method} {path_or_url}"),
                problem: None,
            }),
        }
    }
}

/// Clock that records requested delays and only yields.
#[derive(Default, Clone)]
pub struct FakeClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub struct Harness {
    pub engine: PaymentEngine,
    pub gateway: ScriptedGateway,
    pub store: InMemoryOrderStore,
    pub clock: FakeClock,
}

pub async fn harness(order: Order) -> Harness {
    let gateway = ScriptedGateway::new();
    let store = InMemoryOrderStore::new();
    let clock = FakeClock::default();
    store.insert_order(order).await;

    let engine = PaymentEngine::new(
        Box::new(gateway.clone()),
        Box::new(store.clone()),
        Box::new(clock.clone()),
    )
    .with_reconcile_config(ReconcileConfig {
        max_attempts: 5,
        poll_interval: Duration::from_millis(10),
    });

    Harness {
        engine,
        gateway,
        store,
        clock,
    }
}

/// Card order of 100.00 with 20.00 vat.
pub fn card_order() -> Order {
    let mut order = Order::new("1001", "SEK", dec!(100.00), dec!(20.00), PaymentMethod::Card);
    order.payment_id = Some(PAYMENT_ID.to_string());
    order
}

pub fn checkout_order() -> Order {
    let mut order = Order::new("2001", "SEK", dec!(100.00), dec!(20.00), PaymentMethod::Checkout);
    order.payment_order_id = Some(PAYMENT_ORDER_ID.to_string());
    order
}

pub fn tx_json(number: u64, r#type: &str, state: &str, amount: i64) -> Value {
    json!({
        "id": format!("{PAYMENT_ID}/transactions/t{number}"),
        "number": number,
        "type": r#type,
        "state": state,
        "amount": amount,
        "vatAmount": amount / 5,
        "description": "test transaction",
        "payeeReference": format!("ref{number}")
    })
}

pub fn payment_json(id: &str, instrument: &str, remaining: Value) -> Value {
    let mut payment = json!({"id": id, "instrument": instrument, "state": "Ready"});
    if let (Some(target), Some(extra)) = (payment.as_object_mut(), remaining.as_object()) {
        target.extend(extra.clone());
    }
    json!({"payment": payment, "operations": []})
}

pub fn transactions_json(transactions: Vec<Value>) -> Value {
    json!({"transactions": {"transactionList": transactions}})
}
