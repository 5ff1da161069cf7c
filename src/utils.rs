//!
//! Utility types and functions shared by the gate and its configuration.
//!
//! - [`Sensitive`] - hides a value from `Debug` output and zeroes it on drop
//! - [`RequestIdGenerator`] - preserves or mints `x-request-id` values
//! - [`mint_client_id`] - mints anonymous rollout identities
//! - [`replace_handlebars_with_env`] - `{{ VAR }}` substitution for config files
//!

use {
    http::{HeaderValue, Request},
    regex::{Captures, Regex},
    serde::Deserialize,
    std::{env, sync::LazyLock},
    tower_http::request_id::{MakeRequestId, RequestId},
    uuid::{ContextV7, Timestamp, Uuid},
    zeroize::{Zeroize, ZeroizeOnDrop},
};

/// Matches `{{ VAR_NAME }}` with optional inner whitespace. Names are
/// uppercase letters, digits or underscores.
static HANDLEBAR_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Z0-9_]+)\s*\}\}").unwrap());

/// A wrapper for sensitive data that prints as `Sensitive(****)` and zeroes
/// its memory when dropped.
///
/// The gate wraps session access tokens in it so that a `{:?}` on a
/// [`SessionCredential`](crate::SessionCredential) can never leak a token
/// into the logs.
///
/// ```
/// use edge_gate::Sensitive;
///
/// let token = Sensitive::from("eyJhbGciOiJIUzI1NiJ9.payload.sig");
/// assert_eq!(format!("{:?}", token), "Sensitive(****)");
/// assert!(token.0.starts_with("eyJ"));
/// ```
#[derive(Clone, Deserialize, Default, Zeroize, ZeroizeOnDrop)]
pub struct Sensitive<T: Default + Zeroize>(pub T);

impl Sensitive<String> {
    /// Creates a new `Sensitive<String>` from a string slice.
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<T: Default + Zeroize + PartialEq> PartialEq for Sensitive<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Default + Zeroize> std::fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sensitive(****)")
    }
}

/// Request ID generator for request correlation.
///
/// Implements `tower-http`'s `MakeRequestId`: an incoming `x-request-id`
/// header is preserved, otherwise a new UUIDv7 is generated. UUIDv7 values
/// sort by creation time, which keeps gate decisions for one request easy to
/// find in the logs.
///
/// ```
/// use edge_gate::RequestIdGenerator;
/// use tower_http::request_id::SetRequestIdLayer;
///
/// let layer = SetRequestIdLayer::x_request_id(RequestIdGenerator);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, req: &Request<B>) -> Option<RequestId> {
        match req.headers().get("x-request-id") {
            Some(value) => Some(RequestId::new(value.clone())),
            None => {
                let value = HeaderValue::from_str(&mint_client_id()).ok()?;
                Some(RequestId::new(value))
            }
        }
    }
}

/// Mints a new time-ordered identifier (UUIDv7).
///
/// Used for request ids and for the anonymous-client cookie that keeps a
/// signed-out visitor in the same rollout bucket across reloads.
pub fn mint_client_id() -> String {
    let cx = ContextV7::new().with_additional_precision();
    Uuid::new_v7(Timestamp::now(cx)).to_string()
}

/// Replaces `{{ VAR_NAME }}` placeholders with environment variable values.
///
/// Whitespace inside the braces is optional: `{{VAR}}`, `{{ VAR }}` and
/// `{{  VAR  }}` are equivalent. Unset variables become empty strings and
/// are reported with a warning.
///
/// ```
/// use edge_gate::replace_handlebars_with_env;
///
/// let template = "Value: {{ MISSING_EDGE_GATE_VAR }}";
/// assert_eq!(replace_handlebars_with_env(template), "Value: ");
/// ```
///
/// Substituted values appear in plain text in the returned string; wrap
/// secrets in [`Sensitive`] after parsing and never log the raw template
/// output.
pub fn replace_handlebars_with_env(input: &str) -> String {
    HANDLEBAR_REGEXP
        .replace_all(input, |caps: &Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!(
                    variable = %var_name,
                    "Environment variable not found, substituting with empty string"
                );
                String::new()
            })
        })
        .to_string()
}
