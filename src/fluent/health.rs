//! Kubernetes health probes.

use super::router::FluentRouter;
use crate::HttpMiddleware;

use {axum::routing::get, http::StatusCode};

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Adds the liveness probe at `http.liveness_route`. Always `200 OK`.
    #[must_use]
    pub fn setup_liveness(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::Liveness) {
            return self;
        }

        let route = self.config.http.liveness_route.clone();
        self.inner = self.inner.route(&route, get(|| async { "OK\n" }));
        self
    }

    /// Adds the readiness probe at `http.readiness_route`.
    ///
    /// Reports `503 Service Unavailable` once shutdown has been initiated so
    /// load balancers stop routing to an instance that is draining.
    #[must_use]
    pub fn setup_readiness(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::Readiness) {
            return self;
        }

        let route = self.config.http.readiness_route.clone();
        let token = self.shutdown_notifier.cancellation_token();
        self.inner = self.inner.route(
            &route,
            get(move || {
                let draining = token.is_cancelled();
                async move {
                    if draining {
                        (StatusCode::SERVICE_UNAVAILABLE, "Shutting down\n")
                    } else {
                        (StatusCode::OK, "OK\n")
                    }
                }
            }),
        );
        self
    }
}
