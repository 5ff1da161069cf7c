use serde::Deserialize;

/// Selects which layers [`FluentRouter::setup_middleware`](crate::FluentRouter::setup_middleware)
/// installs.
///
/// ```toml
/// [http.middleware]
/// exclude = ["timeout", "catch-panic"]
/// ```
///
/// With no `[http.middleware]` table every layer is enabled.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMiddlewareConfig {
    Include(Vec<HttpMiddleware>),
    Exclude(Vec<HttpMiddleware>),
}

impl HttpMiddlewareConfig {
    pub fn is_enabled(&self, middleware: HttpMiddleware) -> bool {
        match self {
            HttpMiddlewareConfig::Include(list) => list.contains(&middleware),
            HttpMiddlewareConfig::Exclude(list) => !list.contains(&middleware),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HttpMiddleware {
    EdgeGate,
    RequestId,
    Logging,
    Liveness,
    Readiness,
    Timeout,
    CatchPanic,
}
