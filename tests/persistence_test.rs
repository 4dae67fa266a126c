#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use common::*;
use payrecon::domain::order::OrderStatus;
use serde_json::json;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut server = mockito::Server::new();
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingCaptureAmount": 10000})))
        .create();
    let _capture = server
        .mock("POST", format!("{PAYMENT_ID}/captures").as_str())
        .with_status(200)
        .with_body(
            json!({"capture": {"transaction": transaction(1, "Capture", "Completed", 10000)}})
                .to_string(),
        )
        .create();

    // 1. First run: import the order and capture it
    let orders = tempfile::NamedTempFile::new().unwrap();
    write_orders_csv(orders.path(), &[card_order(OrderStatus::Authorized)]).unwrap();

    let output1 = Command::new(cargo_bin!("payrecon"))
        .arg("--orders")
        .arg(orders.path())
        .arg("--db-path")
        .arg(&db_path)
        .arg("--gateway-url")
        .arg(server.url())
        .arg("capture")
        .arg("1001")
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    assert!(String::from_utf8_lossy(&output1.stdout).contains("captured"));

    // 2. Second run: no import, the captured order is read back from the database
    let output2 = Command::new(cargo_bin!("payrecon"))
        .arg("--db-path")
        .arg(&db_path)
        .arg("--gateway-url")
        .arg("http://127.0.0.1:9")
        .arg("reconcile")
        .arg("1001")
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains("1001,SEK,"));
    assert!(stdout2.contains("captured"));
}
