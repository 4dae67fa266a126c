//! Domain model of orders, gateway payloads and the ports the engine talks through.

pub mod gateway;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod transaction;
