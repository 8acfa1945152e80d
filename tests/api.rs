//! Integration tests for the notification HTTP endpoints.
//!
//! These drive the router directly with `oneshot` requests:
//! - Submit with POST /notify
//! - List with GET /notifications
//! - Delete with DELETE /notifications/{id}

mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use notihub::api::router;
use notihub::hub::HubConfig;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn post_notify(app: &Router, body: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/notify")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn delete(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ping() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    let response = get(&app, "/ping").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], "Notification Service is running ✅".as_bytes());
}

#[tokio::test]
async fn test_submit_list_delete_flow() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    // Step 1: Submit two notifications
    let response = post_notify(&app, r#"{"title": "A", "message": "a"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({"id": 1, "title": "A", "message": "a"}));

    let response = post_notify(&app, r#"{"title": "B", "message": "b"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["id"], 2);

    // Step 2: Delete the first
    let response = delete(&app, "/notifications/1").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Step 3: Only the second remains
    let response = get(&app, "/notifications").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!([{"id": 2, "title": "B", "message": "b"}])
    );

    // Step 4: Deleting again is not found
    let response = delete(&app, "/notifications/1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn test_list_empty() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    let response = get(&app, "/notifications").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_submit_invalid_json() {
    let (state, _pump) = common::create_test_state();
    let hub = state.hub.clone();
    let app = router(state);

    let response = post_notify(&app, "{not json").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_input");
    assert_eq!(hub.notification_count(), 0);
}

#[tokio::test]
async fn test_submit_missing_fields_default_to_empty() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    let response = post_notify(&app, "{}").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["title"], "");
    assert_eq!(json["message"], "");
}

#[tokio::test]
async fn test_delete_invalid_id() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    let response = delete(&app, "/notifications/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "invalid_id");
}

#[tokio::test]
async fn test_wrong_method_rejected() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    let response = get(&app, "/notify").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = delete(&app, "/notifications").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_reports_counts() {
    let (state, _pump) = common::create_test_state();
    let app = router(state);

    post_notify(&app, r#"{"title": "A", "message": "a"}"#).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["notifications"], 1);
    assert_eq!(json["subscribers"], 0);
}

#[tokio::test]
async fn test_submit_busy_returns_503() {
    // The pump is never run, so the queue stays full after one submission.
    let (hub, _pump) = notihub::Hub::new(HubConfig {
        queue_capacity: 1,
        submit_timeout: Duration::from_millis(20),
    });
    let state = notihub::api::AppState {
        hub,
        shutdown: notihub::shutdown::ShutdownCoordinator::new(),
        subscriber_buffer: 4,
    };
    let app = router(state);

    let response = post_notify(&app, r#"{"title": "A", "message": "a"}"#).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_notify(&app, r#"{"title": "B", "message": "b"}"#).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "busy");
}

#[tokio::test]
async fn test_submit_after_shutdown_returns_503() {
    let (state, pump) = common::create_test_state();
    let hub = state.hub.clone();
    let app = router(state);

    hub.shutdown();
    pump.await.unwrap();

    let response = post_notify(&app, r#"{"title": "A", "message": "a"}"#).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "unavailable");
}
