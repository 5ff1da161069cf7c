//! Core FluentRouter struct and initialization methods.

use tokio_util::sync::CancellationToken;

use {
    super::shutdown::{ShutdownNotifier, ShutdownPhase},
    crate::{Config, EdgeGate, HttpMiddleware, PipelineSelectionEvent, Result},
    axum::Router,
    std::sync::Arc,
    tokio::sync::{broadcast, mpsc},
};

/// Fluent builder for axum::Router with configuration-based middleware setup.
///
/// Routes added to the router are the renderers sitting behind the gate;
/// [`FluentRouter::setup_middleware`] wraps them in the edge gate and the
/// surrounding server layers. Create instances using
/// [`FluentRouter::without_state`] or [`FluentRouter::with_state`].
///
/// ```rust,no_run
/// use axum::Extension;
/// use edge_gate::{Config, FluentRouter, RolloutDecision};
///
/// async fn render(Extension(decision): Extension<RolloutDecision>) -> String {
///     format!("rendered by the {} pipeline", decision.pipeline)
/// }
///
/// # async fn example() -> edge_gate::Result<()> {
/// FluentRouter::without_state(Config::default().with_env_overrides())?
///     .fallback(render)
///     .setup_middleware()
///     .await?
///     .start()
///     .await
/// # }
/// ```
pub struct FluentRouter<State = ()> {
    pub(crate) config: Config,
    pub(crate) state: State,
    pub(crate) inner: Router<State>,
    pub(crate) gate: Arc<EdgeGate>,
    pub(crate) panic_channel: Option<mpsc::Sender<String>>,
    pub(crate) shutdown_notifier: ShutdownNotifier,
}

impl FluentRouter {
    /// Creates a new `FluentRouter` without application state.
    pub fn without_state(config: Config) -> Result<FluentRouter<()>> {
        FluentRouter::<()>::with_state(config, ())
    }
}

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Creates a new `FluentRouter` with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The public base URL or a security header value cannot be used
    pub fn with_state<S: Clone + Send + Sync + 'static>(
        config: Config,
        state: S,
    ) -> Result<FluentRouter<S>> {
        config.validate()?;
        let gate = Arc::new(EdgeGate::from_config(&config)?);

        Ok(FluentRouter {
            config,
            state,
            inner: Router::new(),
            gate,
            panic_channel: None,
            shutdown_notifier: ShutdownNotifier::default(),
        })
    }

    /// The configuration this router was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The gate shared by every request.
    #[must_use]
    pub fn gate(&self) -> Arc<EdgeGate> {
        Arc::clone(&self.gate)
    }

    #[must_use]
    pub fn shutdown_notifier(&self) -> &ShutdownNotifier {
        &self.shutdown_notifier
    }

    /// Shortcut for `shutdown_notifier().cancellation_token()`.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown_notifier.cancellation_token()
    }

    /// Shortcut for `shutdown_notifier().subscribe()`.
    #[must_use]
    pub fn subscribe_to_shutdown(&self) -> broadcast::Receiver<ShutdownPhase> {
        self.shutdown_notifier.subscribe()
    }

    /// Helper method to check if a middleware is enabled in the configuration.
    /// Returns true if no middleware config is specified (all enabled by default),
    /// or if the middleware is explicitly enabled/not excluded.
    pub(crate) fn is_middleware_enabled(&self, middleware: HttpMiddleware) -> bool {
        self.config
            .http
            .middleware
            .as_ref()
            .map(|config| config.is_enabled(middleware))
            .unwrap_or(true)
    }

    /// Sets a notification channel for panic messages.
    ///
    /// Panics caught by [`setup_catch_panic`](Self::setup_catch_panic) are
    /// sent here with `try_send`, so a full channel loses messages rather
    /// than stalling the response.
    #[must_use]
    pub fn with_panic_notification_channel(self, ch: mpsc::Sender<String>) -> Self {
        Self {
            panic_channel: Some(ch),
            ..self
        }
    }

    /// Sends a [`PipelineSelectionEvent`] for every request the gate lets
    /// through.
    ///
    /// Must be called before [`setup_edge_gate`](Self::setup_edge_gate). Like
    /// the panic channel, events are dropped when the channel is full.
    ///
    /// ```rust,no_run
    /// # use edge_gate::{Config, FluentRouter};
    /// # fn example() -> edge_gate::Result<()> {
    /// let (tx, mut rx) = tokio::sync::mpsc::channel(1024);
    /// let router = FluentRouter::without_state(Config::default())?
    ///     .with_pipeline_event_channel(tx);
    ///
    /// tokio::spawn(async move {
    ///     while let Some(event) = rx.recv().await {
    ///         tracing::info!(path = %event.path, pipeline = %event.pipeline, "Pipeline selected");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn with_pipeline_event_channel(mut self, ch: mpsc::Sender<PipelineSelectionEvent>) -> Self {
        let gate = EdgeGate::clone(&self.gate).with_event_sender(ch);
        self.gate = Arc::new(gate);
        self
    }
}
