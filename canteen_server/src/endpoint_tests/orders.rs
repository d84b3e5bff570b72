use actix_web::{http::StatusCode, test::TestRequest};
use canteen_engine::{
    db_types::{Money, OrderId, OrderLine, OrderStatusType, UserId},
    order_objects::PlaceOrderRequest,
    PaymentOutcome,
    WalletError,
};
use serde_json::{json, Value};

use super::{helpers::*, mocks::MockCanteenWallet};

const ALICE: UserId = UserId(1);

fn parse(body: &str) -> Value {
    serde_json::from_str(body).expect("Response was not valid JSON")
}

fn paying_wallet() -> MockCanteenWallet {
    let mut wallet = MockCanteenWallet::new();
    wallet.expect_process_payment().returning(|_, _, _| Ok(PaymentOutcome::Paid));
    wallet
}

#[actix_web::test]
async fn place_order() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let req = student(TestRequest::post().uri("/api/orders"), 1)
        .set_json(json!({ "items": [{ "menu_item_id": soup.0, "quantity": 2 }] }));
    let (status, body) = send(req, order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = parse(&body);
    assert_eq!(order["status"], "PendingPayment");
    assert_eq!(order["total_price"], 700);
    assert_eq!(order["user_id"], 1);

    let (status, body) = send(student(TestRequest::get().uri("/api/orders/my-orders"), 1), order_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body).as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn ordering_more_than_is_in_stock() {
    let backend = TestBackend::new().await;
    let pie = backend.add_menu_item("Pie", 600, 1).await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let req = student(TestRequest::post().uri("/api/orders"), 1)
        .set_json(json!({ "items": [{ "menu_item_id": pie.0, "quantity": 2 }] }));
    let (status, body) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse(&body)["error"].is_string(), "{body}");
}

#[actix_web::test]
async fn payment_without_enough_funds() {
    let backend = TestBackend::new().await;
    let pie = backend.add_menu_item("Pie", 600, 5).await;
    let mut wallet = MockCanteenWallet::new();
    wallet
        .expect_process_payment()
        .times(1)
        .returning(|_, _, _| Ok(PaymentOutcome::InsufficientFunds { balance: Money::from(100) }));
    let api = backend.order_flow(wallet);
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(pie, 1)])).await.unwrap();

    let req = student(TestRequest::post().uri(&format!("/api/orders/{}/confirm-payment", order.order_id)), 1);
    let (status, body) = send(req, order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Insufficient funds"), "{body}");
    let order = api.fetch_order(order.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
}

#[actix_web::test]
async fn pay_then_cancel_for_a_full_refund() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let mut wallet = paying_wallet();
    wallet
        .expect_refund()
        .withf(|order_id, amount, _| *order_id == OrderId(1) && *amount == Money::from(700))
        .times(1)
        .returning(|_, _, _| Ok(()));
    let api = backend.order_flow(wallet);
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 2)])).await.unwrap();

    let req = student(TestRequest::post().uri(&format!("/api/orders/{}/confirm-payment", order.order_id)), 1);
    let (status, body) = send(req, order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(parse(&body)["status"], "Paid");

    let req = student(TestRequest::post().uri(&format!("/api/orders/{}/cancel", order.order_id)), 1);
    let (status, body) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let result = parse(&body);
    assert_eq!(result["refund"], 700);
    assert_eq!(result["refund_percentage"], 100);
    assert_eq!(result["order"]["status"], "Cancelled");
}

#[actix_web::test]
async fn customers_only_touch_their_own_orders() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 1)])).await.unwrap();
    let path = format!("/api/orders/{}", order.order_id);

    let (status, _) = send(student(TestRequest::post().uri(&format!("{path}/cancel")), 2), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(student(TestRequest::get().uri(&path), 2), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(student(TestRequest::get().uri(&path), 1), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(staff(TestRequest::get().uri(&path)), order_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let backend = TestBackend::new().await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let (status, _) = send(staff(TestRequest::get().uri("/api/orders/99")), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(staff(TestRequest::post().uri("/api/orders/99/progress")), order_routes(api)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn kitchen_moves_paid_orders_along() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let api = backend.order_flow(paying_wallet());
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 1)])).await.unwrap();
    let progress = format!("/api/orders/{}/progress", order.order_id);

    let (status, _) = send(staff(TestRequest::post().uri(&progress)), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    api.confirm_payment(ALICE, order.order_id).await.unwrap();
    let (status, body) = send(staff(TestRequest::get().uri("/api/orders")), order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body).as_array().map(Vec::len), Some(1));
    for expected in ["Preparing", "ReadyForPickup", "Completed"] {
        let (status, body) = send(staff(TestRequest::post().uri(&progress)), order_routes(api.clone())).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(parse(&body)["status"], expected);
    }
    let (_, body) = send(staff(TestRequest::get().uri("/api/orders")), order_routes(api.clone())).await;
    assert_eq!(body, "[]");
    let (_, body) = send(staff(TestRequest::get().uri("/api/orders/history")), order_routes(api)).await;
    assert_eq!(parse(&body)[0]["status"], "Completed");
}

#[actix_web::test]
async fn rejection_that_cannot_be_refunded() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let mut wallet = paying_wallet();
    wallet.expect_refund().times(1).returning(|_, _, _| Err(WalletError::Backend("ledger offline".into())));
    let api = backend.order_flow(wallet);
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 1)])).await.unwrap();
    api.confirm_payment(ALICE, order.order_id).await.unwrap();

    let req = staff(TestRequest::post().uri(&format!("/api/orders/{}/reject", order.order_id)))
        .set_json(json!({ "reason": "Out of tomatoes" }));
    let (status, body) = send(req, order_routes(api.clone())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("ledger offline"), "{body}");
    let order = api.fetch_order(order.order_id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
}

#[actix_web::test]
async fn rejection_needs_a_reason() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let api = backend.order_flow(paying_wallet());
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 1)])).await.unwrap();
    api.confirm_payment(ALICE, order.order_id).await.unwrap();

    let req = staff(TestRequest::post().uri(&format!("/api/orders/{}/reject", order.order_id)))
        .set_json(json!({ "reason": "  " }));
    let (status, _) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn edit_a_pending_order() {
    let backend = TestBackend::new().await;
    let soup = backend.add_menu_item("Tomato soup", 350, 10).await;
    let pie = backend.add_menu_item("Pie", 600, 5).await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let order = api.place_order(ALICE, PlaceOrderRequest::new(vec![OrderLine::new(soup, 1)])).await.unwrap();

    let req = student(TestRequest::put().uri(&format!("/api/orders/{}", order.order_id)), 1)
        .set_json(json!({ "items": [{ "menu_item_id": pie.0, "quantity": 2 }] }));
    let (status, body) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = parse(&body);
    assert_eq!(order["total_price"], 1200);
    assert_eq!(order["status"], "PendingPayment");
}
