//! Tests for panic catching middleware.

use crate::fluent::tests::*;
use axum::http::StatusCode;
use tower::ServiceExt;

fn panicking_router(router: FluentRouter) -> Router {
    router
        .route(
            "/boom",
            get(|| async {
                panic!("renderer exploded");
                #[allow(unreachable_code)]
                "unreachable"
            }),
        )
        .route("/fine", get(|| async { "fine" }))
        .setup_catch_panic()
        .into_inner()
}

#[tokio::test]
async fn test_panic_becomes_json_500() {
    let app = panicking_router(FluentRouter::without_state(create_base_config()).unwrap());

    let response = app.oneshot(get_request("/boom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = serde_json::from_str(&get_body_string(response).await).unwrap();
    assert_eq!(body["error_code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_panic_is_reported_to_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let app = panicking_router(
        FluentRouter::without_state(create_base_config())
            .unwrap()
            .with_panic_notification_channel(tx),
    );

    app.clone().oneshot(get_request("/fine")).await.unwrap();
    assert!(rx.try_recv().is_err());

    app.oneshot(get_request("/boom")).await.unwrap();
    let msg = rx.try_recv().unwrap();
    assert_eq!(msg, "Service panicked: renderer exploded");
}

#[tokio::test]
async fn test_server_keeps_serving_after_panic() {
    let app = panicking_router(FluentRouter::without_state(create_base_config()).unwrap());

    app.clone().oneshot(get_request("/boom")).await.unwrap();
    let response = app.oneshot(get_request("/fine")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
