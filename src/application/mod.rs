//! Application layer orchestrating the reconciliation of orders with the payment gateway.
//!
//! This module defines the `PaymentEngine`, the entry point for every operation. Its behaviour
//! is split by concern: the eligibility gate, the action dispatcher with its per-instrument
//! executors, the transaction processor and the failed-order reconciliation loop each extend
//! the engine from their own module.

pub mod dispatcher;
pub mod eligibility;
pub mod engine;
pub mod executor;
pub mod processor;
pub mod reconcile;
