//! Edge gate middleware setup.

use super::router::FluentRouter;
use crate::{HttpMiddleware, edge_gate_middleware};

use std::sync::Arc;

impl<State> FluentRouter<State>
where
    State: Clone + Send + Sync + 'static,
{
    /// Puts the edge gate in front of every route and fallback added so far.
    ///
    /// Routes added afterwards (the health probes in
    /// [`setup_middleware`](Self::setup_middleware)) are not gated. Denied
    /// requests are answered with a `307` redirect; the rest reach the inner
    /// handlers carrying `x-render-pipeline` and a
    /// [`RolloutDecision`](crate::RolloutDecision) extension.
    ///
    /// # Configuration
    ///
    /// ```toml
    /// [gate]
    /// protected_prefixes = ["/dashboard", "/settings"]
    /// auth_prefixes = ["/auth/login"]
    ///
    /// [rollout]
    /// enabled = true
    /// percentage = 10
    /// eligible_route_groups = ["dashboard"]
    /// ```
    #[must_use]
    pub fn setup_edge_gate(mut self) -> Self {
        if !self.is_middleware_enabled(HttpMiddleware::EdgeGate) {
            tracing::warn!("Edge gate disabled, protected routes are reachable without a session");
            return self;
        }

        let rollout = &self.config.rollout;
        tracing::info!(
            protected = self.config.gate.protected_prefixes.len(),
            excluded = self.config.gate.excluded_prefixes.len(),
            rollout_enabled = rollout.enabled,
            rollout_percentage = rollout.effective_percentage(),
            eligible = ?rollout.eligible_route_groups,
            "Edge gate installed"
        );

        let gate = Arc::clone(&self.gate);
        self.inner = self
            .inner
            .layer(axum::middleware::from_fn(move |request, next| {
                let gate = Arc::clone(&gate);
                edge_gate_middleware(gate, request, next)
            }));
        self
    }
}
