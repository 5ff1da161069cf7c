mod middleware;
mod security_headers;

pub use middleware::*;
pub use security_headers::*;

use {
    crate::{Error, Result},
    serde::Deserialize,
    std::time::Duration,
    url::Url,
};

///
/// Configuration for the HTTP server
///
/// Covers the bind address, timeouts, probe routes and the settings the
/// gate needs to build redirects for the request it is looking at.
///
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// IP address to bind the HTTP server to
    /// The default `bind_addr` is "127.0.0.1".
    #[serde(default = "HttpConfig::default_bind_addr")]
    pub bind_addr: String,

    /// Port to bind the HTTP server to
    /// The default `bind_port` is 3000.
    #[serde(default = "HttpConfig::default_bind_port")]
    pub bind_port: u16,

    /// Maximum allowed time for a request to complete before timing out
    /// with a 408 Request Timeout response. By default `request_timeout` is None.
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    /// Route for liveness checks.
    /// By default `liveness` is "/live".
    #[serde(default = "HttpConfig::default_liveness_route")]
    pub liveness_route: String,

    /// Route for readiness checks.
    /// By default `readiness` is set to "/ready".
    #[serde(default = "HttpConfig::default_readiness_route")]
    pub readiness_route: String,

    /// Public origin of the site. Redirects fall back to it when a request
    /// carries no usable `Host` header, and its scheme is the one used for
    /// redirects unless `trust_forwarded_proto` is set.
    /// By default `public_base_url` is "http://localhost:3000".
    #[serde(default = "HttpConfig::default_public_base_url")]
    pub public_base_url: String,

    /// Whether to honour `X-Forwarded-Proto` from a fronting proxy when
    /// building redirect targets. Defaults to false.
    #[serde(default)]
    pub trust_forwarded_proto: bool,

    /// Baseline security headers.
    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,

    /// Maximum time to wait for graceful shutdown to complete.
    /// After this timeout, the server will force shutdown.
    /// By default `shutdown_timeout` is set to 30 seconds.
    #[serde(
        default = "HttpConfig::default_shutdown_timeout",
        with = "humantime_serde"
    )]
    pub shutdown_timeout: Duration,

    #[serde(default)]
    pub middleware: Option<HttpMiddlewareConfig>,
}

impl HttpConfig {
    ///
    /// Returns the full bind address as a string in the format "IP:PORT".
    ///
    pub fn full_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.bind_port)
    }

    /// Parses `public_base_url`. Only meaningful after [`validate`](Self::validate).
    pub fn public_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.public_base_url)?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(Error::config(format!(
                "[http] public_base_url must be an absolute http(s) origin, got {:?}",
                self.public_base_url
            )));
        }
        Ok(url)
    }

    fn default_bind_addr() -> String {
        "127.0.0.1".into()
    }

    fn default_bind_port() -> u16 {
        3000
    }

    fn default_liveness_route() -> String {
        "/live".into()
    }

    fn default_readiness_route() -> String {
        "/ready".into()
    }

    fn default_public_base_url() -> String {
        "http://localhost:3000".into()
    }

    fn default_shutdown_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(Error::invalid_input(
                "HTTP bind_addr is required. Set [http] bind_addr = \"0.0.0.0\" or \"127.0.0.1\" in config.",
            ));
        }

        if self.bind_addr.parse::<std::net::IpAddr>().is_err() {
            return Err(Error::invalid_input(
                "HTTP bind_addr must be a valid IP address. Examples: \"127.0.0.1\", \"0.0.0.0\", \"::1\"",
            ));
        }

        let base = self.public_base_url()?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "[http] public_base_url must use http or https, got {:?}",
                base.scheme()
            )));
        }

        for (name, route) in [
            ("liveness_route", &self.liveness_route),
            ("readiness_route", &self.readiness_route),
        ] {
            if !route.starts_with('/') {
                return Err(Error::config(format!(
                    "[http] {name} must start with '/', got {route:?}"
                )));
            }
        }

        self.security_headers.validate()?;

        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            bind_addr: Self::default_bind_addr(),
            bind_port: Self::default_bind_port(),
            request_timeout: None,
            liveness_route: Self::default_liveness_route(),
            readiness_route: Self::default_readiness_route(),
            public_base_url: Self::default_public_base_url(),
            trust_forwarded_proto: false,
            security_headers: SecurityHeadersConfig::default(),
            shutdown_timeout: Self::default_shutdown_timeout(),
            middleware: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    #[test]
    fn test_http_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.full_bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.liveness_route, "/live");
        assert_eq!(config.readiness_route, "/ready");
        assert!(!config.trust_forwarded_proto);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_timeouts_and_base_url() {
        let config: Config = r#"
[http]
bind_addr = "0.0.0.0"
bind_port = 8080
request_timeout = "5s"
shutdown_timeout = "2s"
public_base_url = "https://shop.example.com"
trust_forwarded_proto = true
        "#
        .parse()
        .unwrap();

        assert_eq!(config.http.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.http.shutdown_timeout, Duration::from_secs(2));
        assert!(config.http.trust_forwarded_proto);
        let base = config.http.public_base_url().unwrap();
        assert_eq!(base.host_str(), Some("shop.example.com"));
    }

    #[test]
    fn test_validate_rejects_bad_bind_addr() {
        let config = HttpConfig {
            bind_addr: "localhost".into(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_validate_rejects_relative_base_url() {
        let config = HttpConfig {
            public_base_url: "/just/a/path".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HttpConfig {
            public_base_url: "mailto:ops@example.com".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HttpConfig {
            public_base_url: "ftp://files.example.com".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_probe_route() {
        let config = HttpConfig {
            liveness_route: "live".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
