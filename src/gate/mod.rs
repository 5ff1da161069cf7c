//! The edge gate and its components.
//!
//! - [`classifier`] maps a path to a [`RouteClass`] and a rollout route group
//! - [`session`] checks the session cookies
//! - [`rollout`] picks the rendering [`Pipeline`]
//! - [`redirect`] builds login and landing redirects
//! - [`headers`] composes the security headers
//! - [`edge`] ties them together in [`EdgeGate`] and its axum middleware

mod classifier;
mod edge;
mod headers;
mod redirect;
mod rollout;
mod session;

pub use classifier::*;
pub use edge::*;
pub use headers::*;
pub use redirect::*;
pub use rollout::*;
pub use session::*;
