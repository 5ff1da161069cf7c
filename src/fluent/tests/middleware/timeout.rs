//! Tests for request timeout middleware setup.

use crate::fluent::tests::*;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;

fn slow_router(config: Config) -> Router {
    FluentRouter::without_state(config)
        .unwrap()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                "slow"
            }),
        )
        .setup_timeout()
        .into_inner()
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let app = slow_router(create_base_config().with_request_timeout(Duration::from_millis(50)));

    let response = app.oneshot(get_request("/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_fast_enough_handler_completes() {
    let app = slow_router(create_base_config().with_request_timeout(Duration::from_secs(2)));

    let response = app.oneshot(get_request("/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_string(response).await, "slow");
}

#[tokio::test]
async fn test_no_timeout_by_default() {
    let app = slow_router(create_base_config());

    let response = app.oneshot(get_request("/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_timeout_parsed_from_toml() {
    let config: Config = r#"
[http]
request_timeout = "50ms"
"#
    .parse()
    .unwrap();
    assert_eq!(config.http.request_timeout, Some(Duration::from_millis(50)));

    let response = slow_router(config).oneshot(get_request("/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
