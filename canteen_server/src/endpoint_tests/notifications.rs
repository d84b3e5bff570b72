use actix_web::{http::StatusCode, test::TestRequest, web};
use canteen_engine::{db_types::UserId, events::NotificationEvent, NotificationApi};
use serde_json::Value;

use super::helpers::*;

#[actix_web::test]
async fn read_and_clear_the_inbox() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(NotificationApi::new(backend.db.clone()));
    for message in ["Your order #1 is being prepared.", "Your order #1 is ready for pickup!"] {
        let event = NotificationEvent::new(UserId(1), message, Some("/orders/1".to_string()));
        api.deliver(event).await.unwrap();
    }
    api.deliver(NotificationEvent::new(UserId(2), "Not for Alice", None)).await.unwrap();

    let req = student(TestRequest::get().uri("/api/notifications/unread/count"), 1);
    let (status, body) = send(req, notification_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"count":2}"#);

    let req = student(TestRequest::get().uri("/api/notifications/unread"), 1);
    let (status, body) = send(req, notification_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let inbox: Value = serde_json::from_str(&body).unwrap();
    let notifications = inbox["notifications"].as_array().cloned().unwrap_or_default();
    assert_eq!(notifications.len(), 2);
    assert!(notifications.iter().all(|n| n["user_id"] == 1 && n["is_read"] == false));
    assert!(notifications.iter().any(|n| n["message"] == "Your order #1 is ready for pickup!"));

    let req = student(TestRequest::post().uri("/api/notifications/mark-all-as-read"), 1);
    let (status, body) = send(req, notification_routes(api.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("2 notifications marked as read"), "{body}");

    let req = student(TestRequest::get().uri("/api/notifications/unread/count"), 1);
    let (_, body) = send(req, notification_routes(api.clone())).await;
    assert_eq!(body, r#"{"count":0}"#);

    // Bob's inbox is untouched
    let req = student(TestRequest::get().uri("/api/notifications/unread/count"), 2);
    let (_, body) = send(req, notification_routes(api)).await;
    assert_eq!(body, r#"{"count":1}"#);
}

#[actix_web::test]
async fn staff_have_an_inbox_too() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(NotificationApi::new(backend.db.clone()));
    let (status, body) = send(staff(TestRequest::get().uri("/api/notifications/unread")), notification_routes(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"notifications":[]}"#);
}

#[actix_web::test]
async fn the_inbox_needs_an_identity() {
    let backend = TestBackend::new().await;
    let api = web::Data::new(NotificationApi::new(backend.db.clone()));
    let (status, _) = send(TestRequest::get().uri("/api/notifications/unread/count"), notification_routes(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
