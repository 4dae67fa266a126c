use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const HEADER: [&str; 10] = [
    "order_id",
    "currency",
    "amount",
    "vat_amount",
    "payment_method",
    "payment_id",
    "payment_order_id",
    "status",
    "customer_id",
    "needs_save_token",
];

#[test]
fn test_malformed_orders_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(HEADER).unwrap();

    // Unknown payment method
    wtr.write_record(["1", "SEK", "10", "2", "cash", "", "", "captured", "", ""])
        .unwrap();
    // Text in amount field
    wtr.write_record(["2", "SEK", "ten", "2", "card", "", "", "captured", "", ""])
        .unwrap();
    // Valid order
    wtr.write_record(["3", "SEK", "10", "2", "card", "", "", "captured", "", ""])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--orders")
        .arg(&path)
        .arg("--gateway-url")
        .arg("http://127.0.0.1:9")
        .arg("reconcile")
        .arg("3");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading order"))
        .stdout(predicate::str::contains("3,SEK,10,2,card"));
}

#[test]
fn test_skipped_order_is_not_imported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(HEADER).unwrap();
    wtr.write_record(["1", "SEK", "10", "2", "cash", "", "", "captured", "", ""])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("payrecon"));
    cmd.arg("--orders")
        .arg(&path)
        .arg("--gateway-url")
        .arg("http://127.0.0.1:9")
        .arg("reconcile")
        .arg("1");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error reading order"))
        .stderr(predicate::str::contains("Order not found: 1"));
}
