//! Layers working together in the full stack.

use crate::fluent::tests::*;
use axum::http::{Method, StatusCode, header::LOCATION};
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn test_redirect_keeps_request_id() {
    let app = create_test_router(None).await;

    let request = Request::builder()
        .uri("/wishlist")
        .header("x-request-id", "req-redirect-1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()["x-request-id"], "req-redirect-1");
    assert!(response.headers().contains_key(LOCATION));
}

#[tokio::test]
async fn test_timeout_applies_behind_gate() {
    let config = create_base_config().with_request_timeout(Duration::from_millis(50));
    let app = FluentRouter::without_state(config)
        .unwrap()
        .route(
            "/discover",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "late"
            }),
        )
        .setup_middleware()
        .await
        .unwrap()
        .into_inner();

    let response = app.oneshot(get_request("/discover")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_panic_behind_gate_is_caught() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let app = FluentRouter::without_state(create_base_config())
        .unwrap()
        .with_panic_notification_channel(tx)
        .route(
            "/settings",
            get(|| async {
                panic!("settings renderer failed");
                #[allow(unreachable_code)]
                "unreachable"
            }),
        )
        .setup_middleware()
        .await
        .unwrap()
        .into_inner();

    let response = app
        .oneshot(request_with_cookies(Method::GET, "/settings", &session_cookies()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(rx.try_recv().unwrap().contains("settings renderer failed"));
}

#[tokio::test]
async fn test_gate_denial_never_reaches_renderer() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    let app = FluentRouter::without_state(create_base_config())
        .unwrap()
        .route(
            "/admin",
            get(move || {
                let tx = tx.clone();
                async move {
                    tx.try_send(()).ok();
                    "admin"
                }
            }),
        )
        .setup_middleware()
        .await
        .unwrap()
        .into_inner();

    let response = app.oneshot(get_request("/admin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(rx.try_recv().is_err());
}
