//! Tests for the edge gate layer.

use crate::fluent::tests::*;
use crate::{DecisionReason, Pipeline};
use axum::http::{
    Method, StatusCode,
    header::{HOST, LOCATION, SET_COOKIE},
};
use tower::ServiceExt;

#[tokio::test]
async fn test_protected_route_without_session_redirects() {
    let app = create_test_router(None).await;

    let response = app.oneshot(get_request("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[LOCATION],
        "http://localhost:3000/auth/login?redirect=%2Fdashboard"
    );
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_dot_segments_do_not_skip_the_session_check() {
    let app = create_test_router(None).await;

    for (target, location) in [
        ("//dashboard", "http://localhost:3000/auth/login?redirect=%2F%2Fdashboard"),
        ("/x/../dashboard", "http://localhost:3000/auth/login?redirect=%2Fx%2F..%2Fdashboard"),
        ("/./dashboard", "http://localhost:3000/auth/login?redirect=%2F.%2Fdashboard"),
    ] {
        let response = app.clone().oneshot(get_request(target)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{target}");
        assert_eq!(response.headers()[LOCATION], location, "{target}");
    }
}

#[tokio::test]
async fn test_malformed_user_record_is_sent_to_login() {
    let app = create_test_router(None).await;
    let cookies = format!("auth_access_token={TOKEN}; auth_user_data=%7Bnot-json");

    let response = app
        .oneshot(request_with_cookies(Method::GET, "/dashboard", &cookies))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[LOCATION],
        "http://localhost:3000/auth/login?redirect=%2Fdashboard"
    );
}

#[tokio::test]
async fn test_public_root_passes_with_baseline_headers() {
    let app = create_test_router(None).await;

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert!(!headers.contains_key(LOCATION));
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(
        headers["permissions-policy"],
        "camera=(), microphone=(), geolocation=()"
    );
    assert!(!headers.contains_key(SET_COOKIE));
    assert_eq!(get_body_string(response).await, "legacy|legacy");
}

#[tokio::test]
async fn test_redirect_stays_on_request_host() {
    let app = create_test_router(None).await;

    let request = axum::http::Request::builder()
        .uri("/settings/billing?tab=cards")
        .header(HOST, "shop.example.com")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[LOCATION],
        "http://shop.example.com/auth/login?redirect=%2Fsettings%2Fbilling%3Ftab%3Dcards"
    );
}

#[tokio::test]
async fn test_signed_in_user_is_sent_away_from_login() {
    let app = create_test_router(None).await;

    let response = app
        .oneshot(request_with_cookies(Method::GET, "/auth/login", &session_cookies()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[LOCATION], "http://localhost:3000/dashboard");
}

#[tokio::test]
async fn test_signed_in_user_reaches_protected_route() {
    let app = create_test_router(None).await;

    let response = app
        .oneshot(request_with_cookies(Method::GET, "/dashboard", &session_cookies()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert_eq!(
        headers["permissions-policy"],
        "camera=(), microphone=(), geolocation=()"
    );
    assert!(!headers.contains_key("x-csrf-protection"));
    assert_eq!(get_body_string(response).await, "legacy|legacy");
}

#[tokio::test]
async fn test_short_token_counts_as_signed_out() {
    let app = create_test_router(None).await;
    let cookies = session_cookies().replace(TOKEN, "short");

    let response = app
        .oneshot(request_with_cookies(Method::GET, "/cart", &cookies))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_state_changing_methods_get_csrf_marker() {
    let app = create_test_router(None).await;

    for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
        let response = app
            .clone()
            .oneshot(request_with_cookies(method.clone(), "/discover", ""))
            .await
            .unwrap();
        assert_eq!(response.headers()["x-csrf-protection"], "1", "{method}");
    }
}

#[tokio::test]
async fn test_client_pipeline_header_is_overwritten() {
    let config = create_base_config().with_rollout(0, ["dashboard"]);
    let app = create_test_router(Some(config)).await;

    let mut request = request_with_cookies(Method::GET, "/dashboard", &session_cookies());
    request
        .headers_mut()
        .insert("x-render-pipeline", "new".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(get_body_string(response).await, "legacy|legacy");
}

#[tokio::test]
async fn test_full_rollout_selects_new_pipeline() {
    let config = create_base_config().with_rollout(100, ["dashboard"]);
    let app = create_test_router(Some(config)).await;

    let response = app
        .clone()
        .oneshot(request_with_cookies(Method::GET, "/dashboard/orders", &session_cookies()))
        .await
        .unwrap();
    assert_eq!(get_body_string(response).await, "new|new");

    // Not an eligible group.
    let response = app.oneshot(get_request("/discover")).await.unwrap();
    assert_eq!(get_body_string(response).await, "legacy|legacy");
}

#[tokio::test]
async fn test_excluded_routes_are_untouched() {
    let app = create_test_router(None).await;

    for uri in ["/api/cart", "/_next/static/chunk.js", "/robots.txt"] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(!response.headers().contains_key("x-frame-options"), "{uri}");
        assert_eq!(get_body_string(response).await, "none|none", "{uri}");
    }
}

#[tokio::test]
async fn test_renderer_headers_are_overwritten() {
    let app = create_test_router(None).await;

    let response = app.oneshot(get_request("/framed")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers.get_all("x-frame-options").iter().count(), 1);
    assert_eq!(headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_anonymous_client_cookie_is_minted_once() {
    let config = create_base_config().with_rollout(50, ["home"]);
    let app = create_test_router(Some(config)).await;

    let first = app.clone().oneshot(get_request("/")).await.unwrap();
    let set_cookie = first.headers()[SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("edge_client_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(!set_cookie.contains("Secure"));
    let first_body = get_body_string(first).await;

    let pair = set_cookie.split(';').next().unwrap();
    let second = app
        .oneshot(request_with_cookies(Method::GET, "/", pair))
        .await
        .unwrap();
    assert!(!second.headers().contains_key(SET_COOKIE));
    assert_eq!(get_body_string(second).await, first_body);
}

#[tokio::test]
async fn test_gate_can_be_excluded() {
    let config =
        create_base_config().with_excluded_middlewares(vec![crate::HttpMiddleware::EdgeGate]);
    let app = create_test_router(Some(config)).await;

    let response = app.oneshot(get_request("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_string(response).await, "none|none");
}

#[tokio::test]
async fn test_pipeline_events_reach_the_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let router = FluentRouter::without_state(create_base_config().with_rollout(100, ["dashboard"]))
        .unwrap()
        .with_pipeline_event_channel(tx);
    let app = build_router(router).await;

    app.clone()
        .oneshot(request_with_cookies(Method::GET, "/dashboard", &session_cookies()))
        .await
        .unwrap();
    app.oneshot(get_request("/dashboard")).await.unwrap();

    let event = rx.try_recv().unwrap();
    assert_eq!(event.path, "/dashboard");
    assert_eq!(event.route_group.as_deref(), Some("dashboard"));
    assert_eq!(event.pipeline, Pipeline::New);
    assert_eq!(event.reason, DecisionReason::WithinPercentage);
    assert!(event.authenticated);
    // The redirected request is not reported.
    assert!(rx.try_recv().is_err());
}
