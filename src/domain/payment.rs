use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::gateway::GatewayError;
use super::money::from_minor_units;

/// Which gateway resource a payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Payment,
    PaymentOrder,
}

impl ResourceKind {
    /// Top-level key of the resource in gateway responses.
    pub fn response_key(self) -> &'static str {
        match self {
            ResourceKind::Payment => "payment",
            ResourceKind::PaymentOrder => "paymentOrder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceLink {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResource {
    pub id: String,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub remaining_capture_amount: Option<i64>,
    #[serde(default)]
    pub remaining_cancellation_amount: Option<i64>,
    #[serde(default)]
    pub remaining_reversal_amount: Option<i64>,
    #[serde(default)]
    pub current_payment: Option<ResourceLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub method: Option<String>,
    pub href: String,
    pub rel: String,
}

/// Which remaining-amount counter a decision is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemainingKind {
    Capture,
    Cancellation,
    Reversal,
}

/// Live state of a payment or payment order. Only valid for the instant it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInfo {
    pub kind: ResourceKind,
    pub resource: PaymentResource,
    pub operations: Vec<Operation>,
}

impl PaymentInfo {
    /// Parses a `GET {payment}` or `GET {paymentOrder}` response.
    pub fn from_value(value: &Value) -> Result<Self, GatewayError> {
        let kind = if value.get("paymentOrder").is_some_and(Value::is_object) {
            ResourceKind::PaymentOrder
        } else if value.get("payment").is_some_and(Value::is_object) {
            ResourceKind::Payment
        } else {
            return Err(GatewayError::InvalidResponse(
                "response holds neither a payment nor a payment order".to_string(),
            ));
        };

        let resource = PaymentResource::deserialize(&value[kind.response_key()])?;
        let operations = match value.get("operations") {
            Some(ops) => Vec::<Operation>::deserialize(ops)?,
            None => Vec::new(),
        };

        Ok(Self {
            kind,
            resource,
            operations,
        })
    }

    pub fn operation_by_rel(&self, rel: &str) -> Option<&str> {
        self.operations
            .iter()
            .find(|op| op.rel == rel)
            .map(|op| op.href.as_str())
            .filter(|href| !href.is_empty())
    }

    /// Remaining amount in major units, if the gateway reported the counter.
    pub fn remaining(&self, kind: RemainingKind) -> Option<Decimal> {
        let minor = match kind {
            RemainingKind::Capture => self.resource.remaining_capture_amount,
            RemainingKind::Cancellation => self.resource.remaining_cancellation_amount,
            RemainingKind::Reversal => self.resource.remaining_reversal_amount,
        };
        minor.map(from_minor_units)
    }

    pub fn is_invoice(&self) -> bool {
        self.resource.instrument.as_deref() == Some("Invoice")
    }
}
