//! Tests for `[http.middleware]` include/exclude handling.

use crate::fluent::tests::*;
use crate::HttpMiddleware;
use axum::http::StatusCode;
use tower::ServiceExt;

#[tokio::test]
async fn test_middleware_config_exclude() {
    let config = create_config_with_toml(
        r#"
[http.middleware]
exclude = ["liveness", "request-id"]
"#,
    );
    let app = create_test_router(Some(config)).await;

    let response = app.oneshot(get_request("/discover")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("x-request-id"));
    // The gate is still there.
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_middleware_config_include() {
    let config = create_base_config().with_included_middlewares(vec![
        HttpMiddleware::Liveness,
        HttpMiddleware::RequestId,
    ]);
    let app = create_test_router(Some(config)).await;

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Gate not included: protected route served without a session.
    let response = app.oneshot(get_request("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(get_body_string(response).await, "none|none");
}

#[tokio::test]
async fn test_middleware_config_default_all_enabled() {
    let app = create_test_router(None).await;

    let response = app.clone().oneshot(get_request("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(response.headers().contains_key("x-request-id"));

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logging_disabled_path() {
    let config = create_base_config().with_excluded_middlewares(vec![HttpMiddleware::Logging]);
    let app = create_test_router(Some(config)).await;

    let response = app
        .oneshot(request_with_cookies(
            axum::http::Method::GET,
            "/settings",
            &session_cookies(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
