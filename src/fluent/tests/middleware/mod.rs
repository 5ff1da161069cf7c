//! Middleware-specific tests for FluentRouter.
//!
//! The `interactions` module tests layers working together.

mod catch_panic;
mod config;
mod edge_gate;
mod interactions;
mod request_id;
mod timeout;
