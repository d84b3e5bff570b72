use actix_web::{http::StatusCode, test::TestRequest, web};
use canteen_engine::{db_types::Money, WalletApi, WalletError};
use serde_json::{json, Value};

use super::{helpers::*, mocks::MockCanteenWallet};

fn top_up(user_id: i64, amount: &str) -> TestRequest {
    student(TestRequest::post().uri("/api/wallet/topup"), user_id).set_json(json!({ "amount": amount }))
}

#[actix_web::test]
async fn top_up_and_check_the_balance() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(WalletApi::new(backend.wallet().await));

    let (status, body) = send(top_up(1, "12.50"), wallet_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, r#"{"balance":1250}"#);
    let (status, _) = send(top_up(1, "2.5"), wallet_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(student(TestRequest::get().uri("/api/wallet"), 1), wallet_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"balance":1500}"#);

    let req = student(TestRequest::get().uri("/api/wallet/history"), 1);
    let (status, body) = send(req, wallet_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let history: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history["balance"], 1500);
    assert_eq!(history["transactions"].as_array().map(Vec::len), Some(2));
    assert_eq!(history["transactions"][0]["amount"], 250);

    // Other wallets are untouched
    let (_, body) = send(student(TestRequest::get().uri("/api/wallet"), 2), wallet_routes(api)).await;
    assert_eq!(body, r#"{"balance":0}"#);
}

#[actix_web::test]
async fn top_ups_must_be_positive_amounts() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(WalletApi::new(backend.wallet().await));
    for amount in ["abc", "-1", "0", "1.234"] {
        let (status, body) = send(top_up(1, amount), wallet_routes(api.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{amount}: {body}");
    }
    let (_, body) = send(student(TestRequest::get().uri("/api/wallet"), 1), wallet_routes(api)).await;
    assert_eq!(body, r#"{"balance":0}"#);
}

#[actix_web::test]
async fn only_staff_read_student_statements() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(WalletApi::new(backend.wallet().await));
    send(top_up(7, "5"), wallet_routes(api.clone())).await;

    let req = student(TestRequest::get().uri("/api/wallet/student/7/history"), 7);
    let (status, _) = send(req, wallet_routes(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = staff(TestRequest::get().uri("/api/wallet/student/7/history"));
    let (status, body) = send(req, wallet_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
    let history: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history["balance"], 500);
    assert_eq!(history["transactions"][0]["kind"], "TopUp");
}

#[actix_web::test]
async fn ledger_failures_are_server_errors() {
    let mut ledger = MockCanteenWallet::new();
    ledger.expect_balance().returning(|_| Err(WalletError::Backend("disk full".into())));
    let api = web::Data::new(WalletApi::new(ledger));
    let (status, body) = send(student(TestRequest::get().uri("/api/wallet"), 1), wallet_routes(api)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("error"), "{body}");
}

#[actix_web::test]
async fn top_up_passes_the_parsed_amount_to_the_ledger() {
    let mut ledger = MockCanteenWallet::new();
    ledger
        .expect_top_up()
        .withf(|user_id, amount| user_id.0 == 3 && *amount == Money::from(1005))
        .times(1)
        .returning(|_, amount| Ok(amount));
    let api = web::Data::new(WalletApi::new(ledger));
    let (status, body) = send(top_up(3, "10.05"), wallet_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"balance":1005}"#);
}
