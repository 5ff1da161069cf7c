//! Shutdown notifications.
//!
//! [`FluentRouter::start`](crate::FluentRouter::start) emits a
//! [`ShutdownPhase`] for each step of a graceful shutdown. Background tasks
//! that only need to stop can hold a [`CancellationToken`] instead, which is
//! cancelled together with [`ShutdownPhase::Initiated`].
//!
//! ```rust,no_run
//! use edge_gate::{Config, FluentRouter, ShutdownPhase};
//!
//! # async fn example() -> edge_gate::Result<()> {
//! let router = FluentRouter::without_state(Config::default())?;
//! let mut phases = router.subscribe_to_shutdown();
//!
//! tokio::spawn(async move {
//!     while let Ok(phase) = phases.recv().await {
//!         if let ShutdownPhase::GracePeriodStarted { timeout } = phase {
//!             tracing::info!("Draining for at most {}s", timeout.as_secs());
//!         }
//!     }
//! });
//! # Ok(())
//! # }
//! ```

use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Steps of a graceful shutdown, emitted in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// SIGTERM or SIGINT received. No new connections are accepted.
    Initiated,

    /// In-flight requests are draining for at most `timeout`.
    GracePeriodStarted { timeout: Duration },

    /// The grace period expired with requests still in flight.
    GracePeriodEnded,
}

///
/// Broadcasts [`ShutdownPhase`]s to any number of subscribers. Clones share
/// the same channel and token.
///
#[derive(Clone)]
pub struct ShutdownNotifier {
    sender: broadcast::Sender<ShutdownPhase>,
    cancel_token: CancellationToken,
}

impl ShutdownNotifier {
    /// `capacity` is the number of phases buffered per lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Subscribers only see phases emitted after they subscribed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownPhase> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    #[must_use]
    pub fn is_shutdown_initiated(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Sends `phase` to every subscriber and returns how many received it.
    pub(crate) fn emit(&self, phase: ShutdownPhase) -> usize {
        if phase == ShutdownPhase::Initiated {
            self.cancel_token.cancel();
        }
        self.sender.send(phase).unwrap_or(0)
    }
}

impl Default for ShutdownNotifier {
    fn default() -> Self {
        Self::new(16)
    }
}

impl std::fmt::Debug for ShutdownNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownNotifier")
            .field("subscribers", &self.sender.receiver_count())
            .field("initiated", &self.is_shutdown_initiated())
            .finish()
    }
}
