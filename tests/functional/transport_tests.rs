//! HTTP-level checks performed before the envelope is decoded.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use sidecar_injector::webhooks::{WebhookState, create_webhook_router};

use crate::common::*;

async fn send(content_type: Option<&str>, body: Vec<u8>) -> (StatusCode, String, usize) {
    let store = Arc::new(CountingStore::new(logging_templates()));
    let state = Arc::new(WebhookState::new(store.clone(), true));

    let mut builder = Request::post("/mutate");
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    let request = builder.body(Body::from(body)).unwrap();

    let response = create_webhook_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).to_string(), store.calls())
}

fn opted_in() -> Vec<u8> {
    PodReviewBuilder::new("web")
        .label("injector", "logging")
        .inject("on")
        .build()
}

#[tokio::test]
async fn test_wrong_content_type_is_415() {
    let (status, body, calls) = send(Some("text/plain"), opted_in()).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body.contains("application/json"));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_missing_content_type_is_415() {
    let (status, _, calls) = send(None, opted_in()).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn test_empty_body_is_400() {
    let (status, body, _) = send(Some("application/json"), Vec::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "empty body");
}

#[tokio::test]
async fn test_charset_parameter_is_accepted() {
    let (status, body, calls) = send(Some("application/json; charset=utf-8"), opted_in()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"allowed\":true"));
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_get_is_not_routed() {
    let state = Arc::new(WebhookState::new(
        Arc::new(CountingStore::new(logging_templates())),
        true,
    ));
    let request = Request::get("/mutate").body(Body::empty()).unwrap();

    let response = create_webhook_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
