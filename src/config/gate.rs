use {
    crate::{Error, Result, gate::{prefix_matches, prefixes_overlap}},
    serde::Deserialize,
    url::Url,
};

///
/// Configuration of the session gate: which prefixes need a session, which
/// are for signing in, which bypass the gate, and where denied requests go.
///
/// ```toml
/// [gate]
/// protected_prefixes = ["/dashboard", "/account"]
/// auth_prefixes = ["/auth/login", "/auth/register"]
/// login_path = "/auth/login"
/// landing_path = "/dashboard"
///
/// [gate.session]
/// min_token_length = 16
/// ```
///
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Prefixes that require a valid session. Requests without one are
    /// redirected to `login_path`.
    #[serde(default = "GateConfig::default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,

    /// Sign-in and sign-up prefixes. Requests that already carry a valid
    /// session are redirected to `landing_path`.
    #[serde(default = "GateConfig::default_auth_prefixes")]
    pub auth_prefixes: Vec<String>,

    /// Prefixes that never reach the gate logic (framework assets, the API,
    /// well-known files).
    #[serde(default = "GateConfig::default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,

    /// By default `login_path` is "/auth/login".
    #[serde(default = "GateConfig::default_login_path")]
    pub login_path: String,

    /// By default `landing_path` is "/dashboard".
    #[serde(default = "GateConfig::default_landing_path")]
    pub landing_path: String,

    /// Query parameter carrying the original destination on login redirects.
    /// By default `redirect_param` is "redirect".
    #[serde(default = "GateConfig::default_redirect_param")]
    pub redirect_param: String,

    /// Base URL of the backend API, passed through to renderers unchanged.
    /// Usually set through `API_BASE_URL`.
    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default)]
    pub session: SessionCookieConfig,
}

impl GateConfig {
    fn default_protected_prefixes() -> Vec<String> {
        [
            "/dashboard",
            "/profile",
            "/settings",
            "/admin",
            "/cart",
            "/wishlist",
        ]
        .map(String::from)
        .to_vec()
    }

    fn default_auth_prefixes() -> Vec<String> {
        ["/auth/login", "/auth/register"].map(String::from).to_vec()
    }

    fn default_excluded_prefixes() -> Vec<String> {
        [
            "/_next",
            "/static",
            "/assets",
            "/api",
            "/.well-known",
            "/favicon.ico",
            "/robots.txt",
            "/sitemap.xml",
        ]
        .map(String::from)
        .to_vec()
    }

    fn default_login_path() -> String {
        "/auth/login".into()
    }

    fn default_landing_path() -> String {
        "/dashboard".into()
    }

    fn default_redirect_param() -> String {
        "redirect".into()
    }

    pub fn validate(&self) -> Result<()> {
        for (list, prefixes) in [
            ("protected_prefixes", &self.protected_prefixes),
            ("auth_prefixes", &self.auth_prefixes),
            ("excluded_prefixes", &self.excluded_prefixes),
        ] {
            for prefix in prefixes {
                if !prefix.starts_with('/') || prefix.contains(['?', '#']) {
                    return Err(Error::config(format!(
                        "[gate] {list} entries must be paths starting with '/', got {prefix:?}"
                    )));
                }
            }
        }

        for protected in &self.protected_prefixes {
            if let Some(auth) = self
                .auth_prefixes
                .iter()
                .find(|auth| prefixes_overlap(protected, auth))
            {
                return Err(Error::config(format!(
                    "[gate] protected prefix {protected:?} overlaps auth prefix {auth:?}; the two sets must be disjoint"
                )));
            }
        }

        for (name, path) in [
            ("login_path", &self.login_path),
            ("landing_path", &self.landing_path),
        ] {
            if !path.starts_with('/') || path.contains(['?', '#']) {
                return Err(Error::config(format!(
                    "[gate] {name} must be a plain path starting with '/', got {path:?}"
                )));
            }
        }

        // Either of these would send a browser round in circles.
        if self
            .protected_prefixes
            .iter()
            .any(|p| prefix_matches(p, &self.login_path))
        {
            return Err(Error::config(format!(
                "[gate] login_path {:?} is itself protected",
                self.login_path
            )));
        }
        if self
            .auth_prefixes
            .iter()
            .any(|p| prefix_matches(p, &self.landing_path))
        {
            return Err(Error::config(format!(
                "[gate] landing_path {:?} is an auth route",
                self.landing_path
            )));
        }

        if self.redirect_param.trim().is_empty() {
            return Err(Error::config("[gate] redirect_param must not be empty"));
        }

        if let Some(api_base_url) = &self.api_base_url {
            Url::parse(api_base_url).map_err(|e| {
                Error::config(format!("[gate] api_base_url {api_base_url:?} is invalid: {e}"))
            })?;
        }

        self.session.validate()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: Self::default_protected_prefixes(),
            auth_prefixes: Self::default_auth_prefixes(),
            excluded_prefixes: Self::default_excluded_prefixes(),
            login_path: Self::default_login_path(),
            landing_path: Self::default_landing_path(),
            redirect_param: Self::default_redirect_param(),
            api_base_url: None,
            session: SessionCookieConfig::default(),
        }
    }
}

///
/// Names of the session cookies written by the identity provider, and the
/// shortest access token the gate considers plausible.
///
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCookieConfig {
    /// By default `access_token_cookie` is "auth_access_token".
    #[serde(default = "SessionCookieConfig::default_access_token_cookie")]
    pub access_token_cookie: String,

    /// By default `user_data_cookie` is "auth_user_data".
    #[serde(default = "SessionCookieConfig::default_user_data_cookie")]
    pub user_data_cookie: String,

    /// Tokens shorter than this are rejected without further checks.
    /// This is a sanity check only. By default `min_token_length` is 10.
    #[serde(default = "SessionCookieConfig::default_min_token_length")]
    pub min_token_length: usize,
}

impl SessionCookieConfig {
    fn default_access_token_cookie() -> String {
        "auth_access_token".into()
    }

    fn default_user_data_cookie() -> String {
        "auth_user_data".into()
    }

    fn default_min_token_length() -> usize {
        10
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token_cookie.is_empty() || self.user_data_cookie.is_empty() {
            return Err(Error::config("[gate.session] cookie names must not be empty"));
        }
        if self.access_token_cookie == self.user_data_cookie {
            return Err(Error::config(
                "[gate.session] access_token_cookie and user_data_cookie must differ",
            ));
        }
        Ok(())
    }
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            access_token_cookie: Self::default_access_token_cookie(),
            user_data_cookie: Self::default_user_data_cookie(),
            min_token_length: Self::default_min_token_length(),
        }
    }
}
