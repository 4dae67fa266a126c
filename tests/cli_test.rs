mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::*;
use payrecon::domain::order::OrderStatus;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;
use tempfile::NamedTempFile;

fn orders_file(status: OrderStatus) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    write_orders_csv(file.path(), &[card_order(status)]).unwrap();
    file
}

#[test]
fn test_cli_capture_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingCaptureAmount": 10000})))
        .create();
    let capture = server
        .mock("POST", format!("{PAYMENT_ID}/captures").as_str())
        .match_header("authorization", "Bearer cli-token")
        .with_status(200)
        .with_body(
            json!({"capture": {"transaction": transaction(1, "Capture", "Completed", 10000)}})
                .to_string(),
        )
        .expect(1)
        .create();

    let orders = orders_file(OrderStatus::Authorized);
    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--orders")
        .arg(orders.path())
        .arg("--gateway-url")
        .arg(server.url())
        .arg("--access-token")
        .arg("cli-token")
        .arg("capture")
        .arg("1001");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("order_id,currency,amount"))
        .stdout(predicate::str::contains("1001,SEK,"))
        .stdout(predicate::str::contains("captured"));
    capture.assert();

    Ok(())
}

#[test]
fn test_cli_capture_not_available() {
    let mut server = mockito::Server::new();
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingCaptureAmount": 0})))
        .create();

    let orders = orders_file(OrderStatus::Authorized);
    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--orders")
        .arg(orders.path())
        .arg("--gateway-url")
        .arg(server.url())
        .arg("capture")
        .arg("1001");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Capturing is not available."));
}

#[test]
fn test_cli_unknown_order() {
    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--gateway-url")
        .arg("http://127.0.0.1:9")
        .arg("refund")
        .arg("999");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Order not found: 999"));
}

#[test]
fn test_cli_partial_cancel_is_rejected() {
    let orders = orders_file(OrderStatus::Authorized);
    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--orders")
        .arg(orders.path())
        .arg("--gateway-url")
        .arg("http://127.0.0.1:9")
        .arg("cancel")
        .arg("1001")
        .arg("--amount")
        .arg("40");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Partial cancellation isn't available."));
}
