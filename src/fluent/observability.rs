//! Observability middleware: request logging and request ids.

use super::router::FluentRouter;
use crate::HttpMiddleware;

use {
    crate::utils::RequestIdGenerator,
    axum::body::Body,
    http::{HeaderName, Request},
    tower_http::{
        request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
        trace::TraceLayer as TowerHTTPLayer,
    },
};

pub(crate) const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Sets up HTTP request/response logging middleware.
    ///
    /// Every request gets an `http_request` span with the method, URI and
    /// request id. The gate records the selected `pipeline` on the same
    /// span, so renderer logs carry it too.
    ///
    /// Log output format is controlled by the `logging.format` configuration.
    #[must_use]
    pub fn setup_logging(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::Logging) {
            return self;
        }

        self.inner = self
            .inner
            .layer(
                TowerHTTPLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        request_id = %request_id,
                        pipeline = tracing::field::Empty,
                    )
                }),
            );

        self
    }

    /// Sets up request ID generation and propagation.
    ///
    /// Keeps an incoming `x-request-id`, otherwise generates a UUIDv7, and
    /// copies it onto the response.
    #[must_use]
    pub fn setup_request_id(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::RequestId) {
            return self;
        }

        // Set must wrap propagate, or generated ids never reach the response.
        self.inner = self
            .inner
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, RequestIdGenerator));
        self
    }
}
