//! FluentRouter and middleware configuration.
//!
//! The functionality is split across submodules:
//!
//! - [`router`] - Core `FluentRouter` struct and initialization
//! - [`gate`] - Edge gate layer
//! - [`observability`] - Logging and request ids
//! - [`health`] - Liveness and readiness probes
//! - [`control`] - Timeouts and panic catching
//! - [`shutdown`] - Shutdown phases and cancellation
//! - [`builder`] - Orchestration (setup_middleware, start, router delegation)

mod builder;
mod control;
mod gate;
mod health;
mod observability;
mod router;
mod shutdown;

pub use router::FluentRouter;
pub use shutdown::{ShutdownNotifier, ShutdownPhase};

#[cfg(test)]
mod tests;
