use {
    crate::{Error, Result},
    http::HeaderValue,
    serde::Deserialize,
    std::fmt,
};

/// X-Frame-Options header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum XFrameOptions {
    /// Prevents the page from being displayed in a frame
    #[default]
    Deny,
    /// Allows the page to be displayed in a frame on the same origin
    SameOrigin,
    /// Allows the page to be displayed in a frame on the specified origin
    AllowFrom(String),
}

impl fmt::Display for XFrameOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XFrameOptions::Deny => write!(f, "DENY"),
            XFrameOptions::SameOrigin => write!(f, "SAMEORIGIN"),
            XFrameOptions::AllowFrom(url) => write!(f, "ALLOW-FROM {}", url),
        }
    }
}

/// Configuration wrapper for the X-Frame-Options security header.
///
/// Accepts, case-insensitively:
///
/// - `"DENY"` - prevents the page from being displayed in a frame
/// - `"SAMEORIGIN"` - allows framing only from the same origin
/// - `"ALLOW-FROM <uri>"` or a bare URI - allows the given origin
///
/// ```toml
/// [http.security_headers]
/// x_frame_options = "SAMEORIGIN"
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HttpXFrameConfig(pub XFrameOptions);

impl HttpXFrameConfig {
    pub fn deny() -> Self {
        HttpXFrameConfig(XFrameOptions::Deny)
    }
    pub fn same_origin() -> Self {
        HttpXFrameConfig(XFrameOptions::SameOrigin)
    }
    pub fn allow_from(url: impl Into<String>) -> Self {
        HttpXFrameConfig(XFrameOptions::AllowFrom(url.into()))
    }
}

impl fmt::Debug for HttpXFrameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for HttpXFrameConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.trim();
        let upper = trimmed.to_uppercase();
        let x_frame_options = match upper.as_str() {
            "DENY" => XFrameOptions::Deny,
            "SAMEORIGIN" => XFrameOptions::SameOrigin,
            _ if upper.starts_with("ALLOW-FROM ") => {
                XFrameOptions::AllowFrom(trimmed["ALLOW-FROM ".len()..].trim().to_string())
            }
            _ => XFrameOptions::AllowFrom(trimmed.to_string()),
        };
        Ok(HttpXFrameConfig(x_frame_options))
    }
}

///
/// Baseline security headers attached to every gated response.
///
/// An empty `referrer_policy` or `permissions_policy` omits that header.
///
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityHeadersConfig {
    /// By default `x_frame_options` is "DENY".
    #[serde(default)]
    pub x_frame_options: HttpXFrameConfig,

    /// Whether to send `X-Content-Type-Options: nosniff`. Defaults to true.
    #[serde(default = "SecurityHeadersConfig::default_true")]
    pub x_content_type_nosniff: bool,

    /// By default `referrer_policy` is "strict-origin-when-cross-origin".
    #[serde(default = "SecurityHeadersConfig::default_referrer_policy")]
    pub referrer_policy: String,

    /// By default `permissions_policy` is "camera=(), microphone=(), geolocation=()".
    #[serde(default = "SecurityHeadersConfig::default_permissions_policy")]
    pub permissions_policy: String,

    /// Whether state-changing methods get `X-CSRF-Protection: 1`. Defaults to true.
    #[serde(default = "SecurityHeadersConfig::default_true")]
    pub csrf_marker: bool,
}

impl SecurityHeadersConfig {
    fn default_true() -> bool {
        true
    }

    fn default_referrer_policy() -> String {
        "strict-origin-when-cross-origin".into()
    }

    fn default_permissions_policy() -> String {
        "camera=(), microphone=(), geolocation=()".into()
    }

    pub fn validate(&self) -> Result<()> {
        let x_frame = self.x_frame_options.0.to_string();
        for (name, value) in [
            ("x_frame_options", x_frame.as_str()),
            ("referrer_policy", self.referrer_policy.as_str()),
            ("permissions_policy", self.permissions_policy.as_str()),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(Error::config(format!(
                    "[http.security_headers] {name} is not a valid header value: {value:?}"
                )));
            }
        }

        if matches!(&self.x_frame_options.0, XFrameOptions::AllowFrom(uri) if uri.is_empty()) {
            return Err(Error::config(
                "[http.security_headers] x_frame_options ALLOW-FROM requires an origin",
            ));
        }

        Ok(())
    }
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            x_frame_options: HttpXFrameConfig::deny(),
            x_content_type_nosniff: true,
            referrer_policy: Self::default_referrer_policy(),
            permissions_policy: Self::default_permissions_policy(),
            csrf_marker: true,
        }
    }
}
