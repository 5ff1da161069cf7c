//! Tests for request ID middleware.

use crate::fluent::tests::*;
use axum::http::StatusCode;
use tower::ServiceExt;

fn request_with_id(uri: &str, id: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-request-id", id)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_request_id_preserves_existing_header() {
    let app = FluentRouter::without_state(create_base_config())
        .unwrap()
        .route("/test", get(|| async { "OK" }))
        .setup_request_id()
        .into_inner();

    let response = app
        .oneshot(request_with_id("/test", "custom-request-id-12345"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "custom-request-id-12345");
}

#[tokio::test]
async fn test_request_id_generated_when_absent() {
    let app = FluentRouter::without_state(create_base_config())
        .unwrap()
        .route("/test", get(|| async { "OK" }))
        .setup_request_id()
        .into_inner();

    let response = app.oneshot(get_request("/test")).await.unwrap();
    let id = response.headers()["x-request-id"].to_str().unwrap();
    let uuid = uuid::Uuid::parse_str(id).unwrap();
    assert_eq!(uuid.get_version_num(), 7);
}

#[tokio::test]
async fn test_request_id_visible_to_handlers() {
    let app = FluentRouter::without_state(create_base_config())
        .unwrap()
        .route(
            "/echo",
            get(|request: Request| async move {
                request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string()
            }),
        )
        .setup_request_id()
        .into_inner();

    let response = app.oneshot(request_with_id("/echo", "req-7")).await.unwrap();
    assert_eq!(get_body_string(response).await, "req-7");
}

#[tokio::test]
async fn test_request_id_disabled() {
    let config =
        create_base_config().with_excluded_middlewares(vec![crate::HttpMiddleware::RequestId]);
    let app = FluentRouter::without_state(config)
        .unwrap()
        .route("/test", get(|| async { "OK" }))
        .setup_request_id()
        .into_inner();

    let response = app.oneshot(get_request("/test")).await.unwrap();
    assert!(!response.headers().contains_key("x-request-id"));
}
