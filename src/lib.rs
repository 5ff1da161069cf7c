//! # edge-gate
//!
//! An edge session gate and progressive-delivery router for Axum.
//!
//! Every request is classified against an ordered route table, its session
//! cookies are checked for shape, and it is either redirected (to login, or
//! away from login when already signed in) or passed through with a
//! rendering-pipeline decision and baseline security headers. The pipeline
//! decision is a stable percentage rollout: the same user always lands on
//! the same side.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Extension, routing::get};
//! use edge_gate::{Config, FluentRouter, Pipeline, Result, RolloutDecision};
//!
//! async fn render(Extension(decision): Extension<RolloutDecision>) -> &'static str {
//!     match decision.pipeline {
//!         Pipeline::New => "new renderer",
//!         Pipeline::Legacy => "legacy renderer",
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::default().with_env_overrides(); // config/{RUST_ENV}.toml + ROLLOUT_*
//!     config.setup_tracing();
//!
//!     FluentRouter::without_state(config)?
//!         .route("/live-check", get(|| async { "up" }))
//!         .fallback(render)
//!         .setup_middleware()
//!         .await?
//!         .start()
//!         .await
//! }
//! ```
//!
//! With `config/dev.toml`:
//! ```toml
//! [http]
//! bind_port = 3000
//! public_base_url = "http://localhost:3000"
//!
//! [rollout]
//! enabled = true
//! percentage = 25
//! eligible_route_groups = ["dashboard", "home"]
//! ```
//!
//! # What the gate does
//!
//! | Request | Outcome |
//! |---------|---------|
//! | Excluded prefix (`/_next`, `/api`, ...) | Forwarded untouched |
//! | Protected route, no valid session | `307` to `/auth/login?redirect=<path>` |
//! | Auth route, valid session | `307` to `/dashboard` |
//! | Anything else | Forwarded with `x-render-pipeline` and security headers |
//!
//! # Using the gate directly
//!
//! [`EdgeGate::evaluate`] is a pure function of the request and the
//! configuration, usable without the router:
//!
//! ```rust
//! use edge_gate::{Config, EdgeGate, GateOutcome, GateRequest};
//! use http::Method;
//! use url::Url;
//!
//! let config: Config = "".parse().unwrap();
//! let gate = EdgeGate::from_config(&config).unwrap();
//! let base = Url::parse("https://shop.example.com/").unwrap();
//!
//! match gate.evaluate(&GateRequest::new(Method::GET, "/settings", base)) {
//!     GateOutcome::Redirect { location, .. } => {
//!         assert_eq!(location.as_str(), "https://shop.example.com/auth/login?redirect=%2Fsettings");
//!     }
//!     other => panic!("unexpected {}", other.as_str()),
//! }
//! ```
//!
//! # Error Handling
//!
//! Startup paths return the crate's [`Result`]. Request paths never fail:
//! malformed cookies count as no session and unexpected errors fall back to
//! the legacy pipeline.
//!
//! # Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Configuration loading and validation ([`Config`]) |
//! | `gate` | Classifier, session check, rollout, redirects, headers ([`EdgeGate`]) |
//! | `fluent` | Router builder and middleware setup ([`FluentRouter`]) |
//! | `error` | Error types and handling ([`Error`]) |
//! | `utils` | Utilities ([`Sensitive`], [`RequestIdGenerator`]) |
mod config;
mod error;
mod fluent;
mod gate;
mod utils;

pub use config::*;
pub use error::*;
pub use fluent::*;
pub use gate::*;
pub use utils::*;

pub type Result<T> = std::result::Result<T, Error>;
