//! Orchestration and router delegation: setup_middleware(), start(), layer(), route(), etc.

use super::router::FluentRouter;
use super::shutdown::{ShutdownNotifier, ShutdownPhase};
use crate::Result;

use {
    axum::{Router, body::Body, handler::Handler, routing::Route},
    http::Request,
    std::{convert::Infallible, net::SocketAddr, time::Duration},
    tokio::signal,
    tower::{Layer, Service},
};

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Sets up all standard middleware layers in the correct order.
    ///
    /// Call it after adding the renderer routes: the gate only wraps routes
    /// and fallbacks that already exist.
    ///
    /// # Middleware Order
    ///
    /// Executed on an incoming request from top to bottom:
    ///
    /// 1. **Panic catching** - outermost, catches panics from every layer below
    /// 2. **Liveness** - `/live`, answered before anything else runs
    /// 3. **Request ID** - so logs and the gate see an id
    /// 4. **Timeout** - optional upper bound for everything below
    /// 5. **Readiness** - `/ready`, turns unavailable during shutdown
    /// 6. **Logging** - `http_request` span around the gate and renderers
    /// 7. **Edge gate** - redirects, pipeline selection and security headers
    ///
    /// Layers are added innermost first, so calling the `setup_*` methods by
    /// hand means calling them bottom to top. Prefer `[http.middleware]`
    /// include/exclude lists over skipping calls.
    ///
    /// ```rust,no_run
    /// # use edge_gate::{Config, FluentRouter, Result};
    /// # async fn example() -> Result<()> {
    /// let router = FluentRouter::without_state(Config::default())?
    ///     .setup_edge_gate()
    ///     .setup_logging()
    ///     .setup_request_id()
    ///     .setup_liveness()
    ///     .setup_catch_panic();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn setup_middleware(self) -> Result<Self> {
        const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");
        const VERSION: &str = env!("CARGO_PKG_VERSION");
        tracing::info!("Starting {PACKAGE_NAME} version {VERSION}...");

        let router = self
            .setup_edge_gate() // 1. Innermost - gate in front of the renderers
            .setup_logging() // 2. Request/response logging
            .setup_readiness() // 3. Readiness endpoint (not gated)
            .setup_timeout() // 4. Request timeout (optional)
            .setup_request_id() // 5. Request ID before logging reads it
            .setup_liveness() // 6. Liveness endpoint
            .setup_catch_panic(); // 7. Outermost - panic recovery

        Ok(router)
    }

    /// Starts the HTTP server based on the current configuration.
    ///
    /// On SIGTERM or SIGINT the server stops accepting connections, emits
    /// [`ShutdownPhase::Initiated`] and [`ShutdownPhase::GracePeriodStarted`],
    /// and waits up to `http.shutdown_timeout` for in-flight requests. If
    /// that expires, [`ShutdownPhase::GracePeriodEnded`] is emitted and the
    /// server stops anyway.
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.http.full_bind_addr();
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Bound to {}", &bind_addr);
        tracing::info!(
            "Redirect fallback origin: {}",
            self.config.http.public_base_url
        );

        let service = self
            .inner
            .with_state(self.state)
            .into_make_service_with_connect_info::<SocketAddr>();

        let shutdown_timeout = self.config.http.shutdown_timeout;
        let shutdown_notifier = self.shutdown_notifier.clone();
        let mut shutdown_rx = shutdown_notifier.subscribe();

        let serve_future = axum::serve(listener, service).with_graceful_shutdown(
            shutdown_signal_with_notifications(shutdown_timeout, shutdown_notifier.clone()),
        );

        // The grace period only starts counting once a signal arrived.
        tokio::select! {
            result = serve_future => {
                tracing::info!("Graceful shutdown completed");
                result?;
            }
            _ = async {
                loop {
                    match shutdown_rx.recv().await {
                        Ok(ShutdownPhase::Initiated) => break,
                        Ok(_) => continue,
                        Err(_) => return,
                    }
                }
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                tracing::warn!("Graceful shutdown timeout expired, forcing shutdown");
                shutdown_notifier.emit(ShutdownPhase::GracePeriodEnded);
            }
        }

        Ok(())
    }

    /// Adds a custom Tower middleware layer to the router.
    ///
    /// Forwards to `axum::Router::layer()`.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request<Body>> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request<Body>>>::Response: axum::response::IntoResponse + 'static,
        <L::Service as Service<Request<Body>>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request<Body>>>::Future: Send + 'static,
    {
        self.inner = self.inner.layer(layer);
        self
    }

    /// Adds a new route to the router at the specified path.
    ///
    /// ```
    /// use edge_gate::{Config, FluentRouter};
    /// use axum::routing::get;
    ///
    /// let router = FluentRouter::without_state(Config::default())
    ///     .unwrap()
    ///     .route("/dashboard", get(|| async { "dashboard" }))
    ///     .into_inner();
    /// ```
    #[must_use]
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter<State>) -> Self {
        self.inner = self.inner.route(path, route);
        self
    }

    /// Handles every request no route matches. Renderers that own the whole
    /// URL space usually sit here.
    #[must_use]
    pub fn fallback<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T, State>,
        T: 'static,
    {
        self.inner = self.inner.fallback(handler);
        self
    }

    /// Nests another router at a specific path prefix.
    #[must_use]
    pub fn nest(mut self, path: &str, router: Router<State>) -> Self {
        self.inner = self.inner.nest(path, router);
        self
    }

    /// Merges another router into this one, without a prefix.
    #[must_use]
    pub fn merge(mut self, other: Router<State>) -> Self {
        self.inner = self.inner.merge(other);
        self
    }

    /// Consumes the `FluentRouter` and returns the underlying `axum::Router`.
    ///
    /// Mostly useful in tests, where the router is driven with `oneshot()`.
    pub fn into_inner(self) -> Router<State> {
        self.inner
    }
}

/// Waits for SIGTERM or SIGINT, then emits [`ShutdownPhase::Initiated`]
/// (which cancels the token) and [`ShutdownPhase::GracePeriodStarted`].
///
/// Returns right away so axum starts draining; [`FluentRouter::start`]
/// enforces the timeout. A signal handler that cannot be installed is logged
/// and never fires.
pub(crate) async fn shutdown_signal_with_notifications(
    timeout: Duration,
    notifier: ShutdownNotifier,
) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::debug!("Ctrl+C signal received"),
            Err(err) => {
                tracing::warn!("Failed to install Ctrl+C handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal_handler) => {
                signal_handler.recv().await;
                tracing::debug!("SIGTERM signal received");
            }
            Err(err) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        "Shutdown signal received, draining for up to {}s",
        timeout.as_secs()
    );
    let subscribers = notifier.emit(ShutdownPhase::Initiated);
    tracing::debug!("Shutdown initiated, {subscribers} subscriber(s) notified");

    notifier.emit(ShutdownPhase::GracePeriodStarted { timeout });
}
