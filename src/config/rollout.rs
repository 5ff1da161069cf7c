use {
    crate::{Error, Result},
    serde::Deserialize,
    std::env,
};

///
/// Progressive-delivery configuration: whether the new rendering pipeline is
/// being rolled out, to what share of clients, and on which route groups.
///
/// A missing `[rollout]` table means the rollout is disabled. The
/// `ROLLOUT_ENABLED`, `ROLLOUT_PERCENTAGE` and `ROLLOUT_ROUTE_GROUPS`
/// environment variables override the file through
/// [`Config::with_env_overrides`](crate::Config::with_env_overrides).
///
#[derive(Debug, Clone, Deserialize)]
pub struct RolloutConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Share of clients, 0 to 100, routed to the new pipeline. Values
    /// outside that range are clamped, see [`effective_percentage`](Self::effective_percentage).
    #[serde(default)]
    pub percentage: i64,

    /// Route group names the rollout applies to. Everything else stays on
    /// the legacy pipeline.
    #[serde(default)]
    pub eligible_route_groups: Vec<String>,

    /// What anonymous clients are bucketed on. Defaults to `cookie`.
    #[serde(default)]
    pub anonymous_key: AnonymousKey,

    /// By default `anonymous_cookie` is "edge_client_id".
    #[serde(default = "RolloutConfig::default_anonymous_cookie")]
    pub anonymous_cookie: String,

    /// Salt prepended to the path when `anonymous_key = "path"`.
    #[serde(default = "RolloutConfig::default_path_salt")]
    pub path_salt: String,

    /// Path prefix to route group mapping. The longest matching prefix wins.
    #[serde(default = "RolloutConfig::default_route_groups")]
    pub route_groups: Vec<RouteGroup>,
}

/// Identity used to bucket clients without a valid session.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousKey {
    /// A long-lived random id in a dedicated cookie; assignment sticks
    /// across pages and reloads.
    #[default]
    Cookie,
    /// The request path plus a fixed salt; every visitor of a page gets
    /// the same pipeline.
    Path,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RouteGroup {
    pub name: String,
    pub prefix: String,
}

impl RouteGroup {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }
}

impl RolloutConfig {
    fn default_anonymous_cookie() -> String {
        "edge_client_id".into()
    }

    fn default_path_salt() -> String {
        "edge-rollout-v1".into()
    }

    fn default_route_groups() -> Vec<RouteGroup> {
        [
            ("auth", "/auth"),
            ("dashboard", "/dashboard"),
            ("profile", "/profile"),
            ("settings", "/settings"),
            ("admin", "/admin"),
            ("cart", "/cart"),
            ("wishlist", "/wishlist"),
            ("discover", "/discover"),
            ("home", "/"),
        ]
        .into_iter()
        .map(|(name, prefix)| RouteGroup::new(name, prefix))
        .collect()
    }

    /// The percentage clamped into `0..=100`.
    pub fn effective_percentage(&self) -> u8 {
        self.percentage.clamp(0, 100) as u8
    }

    /// Builds a rollout configuration from the process environment alone.
    ///
    /// Malformed variables disable the rollout instead of failing.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Err(e) = config.overlay_env_with(|name| env::var(name).ok()) {
            tracing::warn!(error = %e, "Rollout environment is malformed, rollout disabled");
            config.enabled = false;
        }
        config
    }

    ///
    /// Applies `ROLLOUT_ENABLED`, `ROLLOUT_PERCENTAGE` and
    /// `ROLLOUT_ROUTE_GROUPS` taken from `lookup`. Unset variables leave the
    /// current value alone.
    ///
    /// Returns [`ErrorKind::ConfigurationAbsent`](crate::ErrorKind::ConfigurationAbsent)
    /// when a variable is set but cannot be parsed; in that case the caller
    /// should treat the rollout as disabled.
    ///
    pub fn overlay_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ROLLOUT_ENABLED") {
            self.enabled = parse_flag(&raw).ok_or_else(|| {
                Error::configuration_absent(format!("ROLLOUT_ENABLED={raw:?} is not a boolean"))
            })?;
        }

        if let Some(raw) = lookup("ROLLOUT_PERCENTAGE") {
            self.percentage = raw.trim().parse::<i64>().map_err(|_| {
                Error::configuration_absent(format!("ROLLOUT_PERCENTAGE={raw:?} is not an integer"))
            })?;
        }

        if let Some(raw) = lookup("ROLLOUT_ROUTE_GROUPS") {
            self.eligible_route_groups = raw
                .split(',')
                .map(str::trim)
                .filter(|group| !group.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for group in &self.route_groups {
            if group.name.trim().is_empty() {
                return Err(Error::config("[rollout] route group names must not be empty"));
            }
            if !group.prefix.starts_with('/') {
                return Err(Error::config(format!(
                    "[rollout] route group {:?} prefix must start with '/', got {:?}",
                    group.name, group.prefix
                )));
            }
        }

        if self.anonymous_cookie.is_empty() {
            return Err(Error::config("[rollout] anonymous_cookie must not be empty"));
        }

        if !(0..=100).contains(&self.percentage) {
            tracing::warn!(
                percentage = self.percentage,
                effective = self.effective_percentage(),
                "Rollout percentage outside 0..=100, clamping"
            );
        }

        for eligible in &self.eligible_route_groups {
            if !self.route_groups.iter().any(|g| &g.name == eligible) {
                tracing::warn!(
                    route_group = %eligible,
                    "Eligible route group matches no configured prefix"
                );
            }
        }

        Ok(())
    }
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            percentage: 0,
            eligible_route_groups: Vec::new(),
            anonymous_key: AnonymousKey::default(),
            anonymous_cookie: Self::default_anonymous_cookie(),
            path_salt: Self::default_path_salt(),
            route_groups: Self::default_route_groups(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
