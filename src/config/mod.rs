//!
//! Configuration structures and utilities for wiring up the gate and its server.
//!
//! A configuration can be created in many ways:
//! - From an environment-specific TOML file via `Config::from_rust_env` or `Config::from_toml_file`
//! - From a TOML string via `Config::from_toml`
//! - Constructed programmatically via the builder methods on `Config`
//!
//! In both TOML-based methods, environment variables can be referenced in the TOML
//! using the {{ VAR_NAME }} syntax, and they will be substituted with the corresponding
//! environment variable value. On top of that, `Config::with_env_overrides` applies
//! the `ROLLOUT_*` and `API_BASE_URL` variables so a rollout can be dialled up or
//! down per deployment without touching the file.
//!
//! Configuration is split into logical sections, each represented by their own struct:
//!
//! - `HttpConfig` for HTTP server settings and security headers
//! - `GateConfig` for route prefixes, redirect targets and session cookies
//! - `RolloutConfig` for the progressive-delivery switch
//! - `LoggingConfig` for logging and tracing settings
//!
mod gate;
mod http;
mod logging;
mod rollout;

pub use gate::*;
pub use http::*;
pub use logging::*;
pub use rollout::*;

use {
    crate::{Error, Result, utils::replace_handlebars_with_env},
    serde::Deserialize,
    std::{env, fs, str::FromStr, time::Duration},
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    ///
    /// Creates a default configuration.
    /// This will attempt to load configuration from the file based on the RUST_ENV
    /// environment variable falling back to a default configuration if the environment
    /// variable is not set. Configuration files should be located in the "config/"
    /// directory of your project.
    ///
    fn default() -> Self {
        match Self::from_rust_env() {
            Ok(config) => config,
            Err(_) => Config {
                http: HttpConfig::default(),
                gate: GateConfig::default(),
                rollout: RolloutConfig::default(),
                logging: LoggingConfig::default(),
            },
        }
    }
}

impl Config {
    ///
    /// Loads the configuration from a file based on the RUST_ENV environment variable.
    ///
    pub fn from_rust_env() -> Result<Config> {
        Self::from_toml_file(env::var("RUST_ENV")?)
    }

    ///
    /// Given an environment name, loads the corresponding configuration file,
    /// substitutes any environment variables, and returns a Config struct.
    /// The configuration file is expected to be located at "config/{env}.toml"
    /// where {env} is the provided environment name (e.g., "dev", "prod").
    ///
    pub fn from_toml_file(env: impl AsRef<str>) -> Result<Config> {
        let path = format!("config/{}.toml", env.as_ref());
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    ///
    /// Parses a configuration string in TOML format into a Config struct.
    ///
    pub fn from_toml(toml_str: &str) -> Result<Config> {
        toml_str.parse()
    }

    ///
    /// Applies the rollout and API environment variables on top of this
    /// configuration. A malformed rollout variable disables the rollout and
    /// is logged; it never fails startup.
    ///
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(|name| env::var(name).ok())
    }

    /// Same as [`with_env_overrides`](Self::with_env_overrides) with an
    /// explicit variable lookup.
    pub fn with_env_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Err(e) = self.rollout.overlay_env_with(&lookup) {
            tracing::warn!(error = %e, "Rollout environment is malformed, rollout disabled");
            self.rollout.enabled = false;
        }

        if let Some(api_base_url) = lookup("API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.gate.api_base_url = Some(api_base_url.trim().to_string());
        }

        self
    }

    /// Sets the HTTP server bind address of the HttpConfig.
    pub fn with_bind_addr<S: AsRef<str>>(mut self, addr: S) -> Self {
        self.http.bind_addr = addr.as_ref().into();
        self
    }

    /// Sets the HTTP server bind port of the HttpConfig.
    pub fn with_bind_port(mut self, port: u16) -> Self {
        self.http.bind_port = port;
        self
    }

    /// Sets the request timeout duration of the HttpConfig.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = Some(timeout);
        self
    }

    /// Sets the graceful shutdown timeout of the HttpConfig.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.http.shutdown_timeout = timeout;
        self
    }

    /// Sets the liveness route path of the HttpConfig.
    pub fn with_liveness_route(mut self, route: &str) -> Self {
        self.http.liveness_route = route.into();
        self
    }

    /// Sets the readiness route path of the HttpConfig.
    pub fn with_readiness_route(mut self, route: &str) -> Self {
        self.http.readiness_route = route.into();
        self
    }

    /// Sets the public base URL used as the redirect fallback.
    pub fn with_public_base_url(mut self, url: &str) -> Self {
        self.http.public_base_url = url.into();
        self
    }

    /// Enables or disables trusting `X-Forwarded-Proto` for redirects.
    pub fn with_trust_forwarded_proto(mut self, trust: bool) -> Self {
        self.http.trust_forwarded_proto = trust;
        self
    }

    /// Replaces the baseline security header configuration.
    pub fn with_security_headers(mut self, headers: SecurityHeadersConfig) -> Self {
        self.http.security_headers = headers;
        self
    }

    /// Sets the log format of the LoggingConfig.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.logging.format = format;
        self
    }

    /// Sets the middleware configuration of the HttpConfig.
    /// This approach activates only the specified middlewares.
    pub fn with_included_middlewares(mut self, middlewares: Vec<HttpMiddleware>) -> Self {
        self.http.middleware = Some(HttpMiddlewareConfig::Include(middlewares));
        self
    }

    /// Sets the middleware configuration of the HttpConfig.
    /// This approach activates all middlewares except the specified ones.
    pub fn with_excluded_middlewares(mut self, middlewares: Vec<HttpMiddleware>) -> Self {
        self.http.middleware = Some(HttpMiddlewareConfig::Exclude(middlewares));
        self
    }

    /// Replaces the protected prefixes of the GateConfig.
    pub fn with_protected_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gate.protected_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the auth prefixes of the GateConfig.
    pub fn with_auth_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gate.auth_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the excluded prefixes of the GateConfig.
    pub fn with_excluded_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gate.excluded_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the minimum plausible access token length of the session check.
    pub fn with_min_token_length(mut self, length: usize) -> Self {
        self.gate.session.min_token_length = length;
        self
    }

    /// Enables the rollout at the given percentage for the given route groups.
    pub fn with_rollout<I, S>(mut self, percentage: i64, route_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rollout.enabled = true;
        self.rollout.percentage = percentage;
        self.rollout.eligible_route_groups = route_groups.into_iter().map(Into::into).collect();
        self
    }

    /// Turns the rollout off without touching its other settings.
    pub fn without_rollout(mut self) -> Self {
        self.rollout.enabled = false;
        self
    }

    /// Selects what anonymous clients are bucketed on.
    pub fn with_anonymous_key(mut self, key: AnonymousKey) -> Self {
        self.rollout.anonymous_key = key;
        self
    }

    /// Ensures that the configuration is valid.
    /// Every value has a default; this catches values that are present but
    /// inconsistent, such as overlapping prefix sets.
    pub fn validate(&self) -> Result<()> {
        self.http.validate()?;
        self.gate.validate()?;
        self.rollout.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    ///
    /// Sets up the tracing subscriber for logging based on the LoggingConfig.
    ///
    /// NOTE: This should be called early during startup to ensure logging is configured
    ///       before any log messages are emitted.
    ///
    pub fn setup_tracing(&self) {
        use tracing_subscriber::{EnvFilter, prelude::*};
        let env_filter = EnvFilter::from_default_env();
        match self.logging.format {
            LogFormat::Json => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().json())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Default => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Compact => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().compact())
                    .with(env_filter)
                    .try_init();
            }
            LogFormat::Pretty => {
                let _ = tracing_subscriber::registry()
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .with(env_filter)
                    .try_init();
            }
        }
    }
}

///
/// Parses a configuration string with references to environment variables
/// into a Config struct by substituting the environment variables and then
/// parsing the resulting TOML.
///
impl FromStr for Config {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let config_file = replace_handlebars_with_env(s);
        let config = toml::from_str::<Config>(&config_file)?;
        Ok(config)
    }
}
