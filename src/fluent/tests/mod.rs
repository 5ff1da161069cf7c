//! Test helpers for FluentRouter tests.
//!
//! These tests drive the router in-process with `oneshot()`. Tests against a
//! real listener live in the crate's `tests/` directory.

use crate::{Config, FluentRouter, RENDER_PIPELINE_HEADER, RolloutDecision};
use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{Method, header::COOKIE},
    response::Response,
    routing::get,
};

pub(crate) mod middleware;

pub(crate) const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.session";
pub(crate) const USER: &str = r#"{"id":"u-42","email":"ada@example.com"}"#;

/// Base TOML configuration for tests. Additional sections may be appended
/// with [`create_config_with_toml`]; they must not reopen `[http]`.
const BASE_CONFIG_TOML: &str = r#"
[http]
bind_addr = "127.0.0.1"
bind_port = 3000
liveness_route = "/health"
readiness_route = "/ready"
public_base_url = "http://localhost:3000"

[logging]
format = "json"
"#;

pub(crate) fn create_base_config() -> Config {
    BASE_CONFIG_TOML
        .parse()
        .expect("Failed to parse test config TOML")
}

pub(crate) fn create_config_with_toml(additional_toml: &str) -> Config {
    format!("{BASE_CONFIG_TOML}\n{additional_toml}")
        .parse()
        .expect("Failed to parse test config TOML")
}

/// Stand-in renderer: answers `<decision>|<x-render-pipeline>`, or `none`
/// for requests the gate did not touch.
pub(crate) async fn render(request: Request) -> String {
    let decision = request
        .extensions()
        .get::<RolloutDecision>()
        .map(|d| d.pipeline.as_str())
        .unwrap_or("none");
    let header = request
        .headers()
        .get(RENDER_PIPELINE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    format!("{decision}|{header}")
}

/// Full middleware stack over a catch-all renderer.
pub(crate) async fn create_test_router(config: Option<Config>) -> Router {
    let config = config.unwrap_or_else(create_base_config);
    build_router(FluentRouter::without_state(config).expect("Failed to create FluentRouter")).await
}

pub(crate) async fn build_router(router: FluentRouter) -> Router {
    router
        .route(
            "/framed",
            get(|| async { ([("x-frame-options", "ALLOWALL")], "framed") }),
        )
        .fallback(render)
        .setup_middleware()
        .await
        .expect("Failed to setup middleware")
        .into_inner()
}

pub(crate) fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn request_with_cookies(method: Method, uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

/// `Cookie` header value of a signed-in user.
pub(crate) fn session_cookies() -> String {
    let user = cookie::Cookie::new("auth_user_data", USER).encoded().to_string();
    format!("auth_access_token={TOKEN}; {user}")
}

pub(crate) async fn get_body_string(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&body).to_string()
}
