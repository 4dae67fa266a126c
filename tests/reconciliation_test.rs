mod common;

use common::*;
use mockito::Matcher;
use payrecon::application::reconcile::ReconcileOutcome;
use payrecon::domain::order::OrderStatus;
use payrecon::domain::ports::OrderStore;
use payrecon::error::PaymentError;
use rust_decimal_macros::dec;
use serde_json::json;

#[tokio::test]
async fn test_full_refund_of_card_order() {
    let mut server = mockito::Server::new_async().await;
    let _transactions = server
        .mock("GET", format!("{PAYMENT_ID}/transactions").as_str())
        .with_status(200)
        .with_body(transactions_body(vec![transaction(1, "Capture", "Completed", 10000)]))
        .create_async()
        .await;
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingReversalAmount": 0})))
        .create_async()
        .await;
    let reversal = server
        .mock("POST", format!("{PAYMENT_ID}/reversals").as_str())
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(
            json!({"transaction": {"amount": 10000, "vatAmount": 2000}}),
        ))
        .with_status(200)
        .with_body(
            json!({"reversal": {"transaction": transaction(2, "Reversal", "Completed", 10000)}})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (engine, store) = engine_for(&server.url(), card_order(OrderStatus::Captured)).await;
    let order_id = "1001".into();

    assert!(engine.can_refund_order(&order_id, None).await.unwrap());
    let response = engine.refund(&order_id, None, None).await.unwrap();

    reversal.assert_async().await;
    assert_eq!(response.transaction.map(|tx| tx.number), Some(2));
    assert_eq!(store.get_order(&order_id).await.unwrap().status, OrderStatus::Refunded);
    assert!(store.notes(&order_id).await.iter().any(|note| note.contains("100")));
}

#[tokio::test]
async fn test_partial_refund_keeps_status_and_adds_note() {
    let mut server = mockito::Server::new_async().await;
    let _transactions = server
        .mock("GET", format!("{PAYMENT_ID}/transactions").as_str())
        .with_status(200)
        .with_body(transactions_body(vec![transaction(1, "Capture", "Completed", 10000)]))
        .create_async()
        .await;
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingReversalAmount": 5000})))
        .create_async()
        .await;
    let reversal = server
        .mock("POST", format!("{PAYMENT_ID}/reversals").as_str())
        .match_body(Matcher::PartialJson(
            json!({"transaction": {"amount": 5000, "vatAmount": 0}}),
        ))
        .with_status(200)
        .with_body(
            json!({"reversal": {"transaction": transaction(3, "Reversal", "Completed", 5000)}})
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (engine, store) = engine_for(&server.url(), card_order(OrderStatus::Captured)).await;
    let order_id = "1001".into();

    engine.refund(&order_id, Some(dec!(50.00)), None).await.unwrap();

    reversal.assert_async().await;
    assert_eq!(store.get_order(&order_id).await.unwrap().status, OrderStatus::Captured);
    assert!(store.notes(&order_id).await.iter().any(|note| note.contains("Refunded: 50")));
}

#[tokio::test]
async fn test_capture_not_available_sends_no_capture() {
    let mut server = mockito::Server::new_async().await;
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingCaptureAmount": 0})))
        .create_async()
        .await;
    let capture = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (engine, _store) = engine_for(&server.url(), card_order(OrderStatus::Authorized)).await;
    let err = engine.capture(&"1001".into(), None, None).await.unwrap_err();

    assert_eq!(err.to_string(), "Capturing is not available.");
    capture.assert_async().await;
}

#[tokio::test]
async fn test_partial_cancellation_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let get = server.mock("GET", Matcher::Any).expect(0).create_async().await;
    let post = server.mock("POST", Matcher::Any).expect(0).create_async().await;

    let (engine, _store) = engine_for(&server.url(), card_order(OrderStatus::Authorized)).await;
    let err = engine
        .cancel(&"1001".into(), Some(dec!(40)), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::PartialCancellationUnavailable));
    get.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn test_sync_marks_refunded_when_reversal_matches_order_amount() {
    let mut server = mockito::Server::new_async().await;
    let _transactions = server
        .mock("GET", format!("{PAYMENT_ID}/transactions").as_str())
        .with_status(200)
        .with_body(transactions_body(vec![
            transaction(1, "Capture", "Completed", 10000),
            transaction(2, "Reversal", "Completed", 10000),
        ]))
        .create_async()
        .await;
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({})))
        .create_async()
        .await;

    let (engine, store) = engine_for(&server.url(), card_order(OrderStatus::Captured)).await;
    let summary = engine
        .fetch_transactions_and_update_order(&"1001".into(), None)
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.get_order(&"1001".into()).await.unwrap().status, OrderStatus::Refunded);
}

#[tokio::test]
async fn test_reversal_with_remaining_amount_leaves_status() {
    let mut server = mockito::Server::new_async().await;
    let _transactions = server
        .mock("GET", format!("{PAYMENT_ID}/transactions").as_str())
        .with_status(200)
        .with_body(transactions_body(vec![transaction(2, "Reversal", "Completed", 10000)]))
        .create_async()
        .await;
    let _payment = server
        .mock("GET", PAYMENT_ID)
        .with_status(200)
        .with_body(payment_body(json!({"remainingReversalAmount": 2500})))
        .create_async()
        .await;

    let (engine, store) = engine_for(&server.url(), card_order(OrderStatus::Captured)).await;
    engine
        .fetch_transactions_and_update_order(&"1001".into(), Some(2))
        .await
        .unwrap();

    assert_eq!(store.get_order(&"1001".into()).await.unwrap().status, OrderStatus::Captured);
    assert_eq!(store.notes(&"1001".into()).await, vec!["Refunded: 100.".to_string()]);
}

#[tokio::test]
async fn test_failed_order_reconciled_at_first_completed_authorization() {
    let mut server = mockito::Server::new_async().await;
    let mut list: Vec<_> = (1..=4)
        .map(|number| transaction(number, "Authorization", "Failed", 10000))
        .collect();
    list.push(transaction(5, "Authorization", "Completed", 10000));
    list.extend((6..=10).map(|number| transaction(number, "Authorization", "Completed", 10000)));
    let _transactions = server
        .mock("GET", format!("{PAYMENT_ID}/transactions").as_str())
        .with_status(200)
        .with_body(transactions_body(list))
        .create_async()
        .await;

    let (engine, store) = engine_for(&server.url(), card_order(OrderStatus::Failed)).await;
    let outcome = engine.resolve_failed_order(&"1001".into()).await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Resolved {
            transaction_number: 5,
            attempts: 1
        }
    );
    let order = store.get_order(&"1001".into()).await.unwrap();
    assert_eq!(order.status, OrderStatus::Authorized);
    assert_eq!(order.payment_id.as_deref(), Some(PAYMENT_ID));
    let history = store.status_history(&"1001".into()).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_number, Some(5));
}

#[tokio::test]
async fn test_unreachable_gateway_exhausts_reconciliation() {
    let (engine, store) = engine_for("http://127.0.0.1:9", card_order(OrderStatus::Failed)).await;

    let outcome = engine.resolve_failed_order(&"1001".into()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Exhausted { attempts: 3 });
    assert_eq!(store.get_order(&"1001".into()).await.unwrap().status, OrderStatus::Failed);
}
