use actix_web::{http::StatusCode, test::TestRequest};
use canteen_engine::db_types::Role;

use super::{helpers::*, mocks::MockCanteenWallet};

#[actix_web::test]
async fn health_needs_no_identity() {
    let backend = TestBackend::new().await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let (status, body) = send(TestRequest::get().uri("/health"), order_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn requests_without_identity_are_unauthorized() {
    let backend = TestBackend::new().await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let (status, body) = send(TestRequest::get().uri("/api/orders/my-orders"), order_routes(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("error"), "{body}");
}

#[actix_web::test]
async fn malformed_identity_is_unauthorized() {
    let backend = TestBackend::new().await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let req = TestRequest::get()
        .uri("/api/orders/my-orders")
        .insert_header(("canteen-user-id", "alice"))
        .insert_header(("canteen-user-role", "Student"));
    let (status, _) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let api = backend.order_flow(MockCanteenWallet::new());
    let req = TestRequest::get()
        .uri("/api/orders/my-orders")
        .insert_header(("canteen-user-id", "1"))
        .insert_header(("canteen-user-role", "Janitor"));
    let (status, _) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn students_cannot_use_staff_routes() {
    let backend = TestBackend::new().await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let (status, _) = send(student(TestRequest::get().uri("/api/orders"), 1), order_routes(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let api = backend.order_flow(MockCanteenWallet::new());
    let req = student(TestRequest::post().uri("/api/orders/1/progress"), 1);
    let (status, _) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn staff_cannot_place_orders() {
    let backend = TestBackend::new().await;
    let item = backend.add_menu_item("Toastie", 300, 5).await;
    let api = backend.order_flow(MockCanteenWallet::new());
    let req = staff(TestRequest::post().uri("/api/orders"))
        .set_json(serde_json::json!({ "items": [{ "menu_item_id": item.0, "quantity": 1 }] }));
    let (status, _) = send(req, order_routes(api)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn every_staff_role_sees_the_kitchen_queue() {
    let backend = TestBackend::new().await;
    for role in [Role::CanteenStaff, Role::CanteenManager, Role::SystemAdmin] {
        let api = backend.order_flow(MockCanteenWallet::new());
        let (status, body) = send(as_user(TestRequest::get().uri("/api/orders"), 50, role), order_routes(api)).await;
        assert_eq!(status, StatusCode::OK, "{role}");
        assert_eq!(body, "[]");
    }
}
