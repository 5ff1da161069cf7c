//! Route classification.
//!
//! Paths are matched against ordered prefix tables. Matching is segment
//! aware: `/dashboard` covers `/dashboard` and `/dashboard/orders` but not
//! `/dashboardx`.

use {
    crate::{Config, GateConfig, RolloutConfig},
    std::{borrow::Cow, fmt},
};

/// What kind of route a path is, as far as the gate is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// May be reached with or without a session.
    Public,
    /// Sign-in and sign-up pages; signed-in clients are sent away.
    Auth,
    /// Requires a valid session.
    Protected,
    /// Never evaluated by the gate.
    Excluded,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Auth => "auth",
            RouteClass::Protected => "protected",
            RouteClass::Excluded => "excluded",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two flags of a classification. At most one is ever true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub is_protected: bool,
    pub is_auth_route: bool,
}

/// Ordered prefix tables for route classes and rollout route groups.
#[derive(Debug, Clone)]
pub struct RouteTable {
    protected: Vec<String>,
    auth: Vec<String>,
    excluded: Vec<String>,
    /// `(prefix, group name)`, longest prefix first.
    groups: Vec<(String, String)>,
}

impl RouteTable {
    pub fn new(gate: &GateConfig, rollout: &RolloutConfig) -> Self {
        let normalized = |prefixes: &[String]| -> Vec<String> {
            prefixes
                .iter()
                .map(|p| normalize_path(p).to_string())
                .collect()
        };

        let mut groups: Vec<(String, String)> = rollout
            .route_groups
            .iter()
            .map(|g| (normalize_path(&g.prefix).to_string(), g.name.clone()))
            .collect();
        // Stable sort keeps the configured order between equal lengths.
        groups.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            protected: normalized(&gate.protected_prefixes),
            auth: normalized(&gate.auth_prefixes),
            excluded: normalized(&gate.excluded_prefixes),
            groups,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.gate, &config.rollout)
    }

    /// Flags for `path`. Excluded paths yield both flags false.
    pub fn classify(&self, path: &str) -> Classification {
        match self.classify_path(path) {
            RouteClass::Protected => Classification {
                is_protected: true,
                is_auth_route: false,
            },
            RouteClass::Auth => Classification {
                is_protected: false,
                is_auth_route: true,
            },
            RouteClass::Public | RouteClass::Excluded => Classification::default(),
        }
    }

    /// Exclusions are checked first, then protected, then auth prefixes.
    pub fn classify_path(&self, path: &str) -> RouteClass {
        let path = normalize_path(path);
        if matches_any(&self.excluded, &path) {
            RouteClass::Excluded
        } else if matches_any(&self.protected, &path) {
            RouteClass::Protected
        } else if matches_any(&self.auth, &path) {
            RouteClass::Auth
        } else {
            RouteClass::Public
        }
    }

    /// Name of the rollout route group `path` belongs to, if any.
    pub fn route_group(&self, path: &str) -> Option<&str> {
        let path = normalize_path(path);
        self.groups
            .iter()
            .find(|(prefix, _)| prefix_matches(prefix, &path))
            .map(|(_, name)| name.as_str())
    }
}

fn matches_any(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|prefix| prefix_matches(prefix, path))
}

///
/// Strips any query string or fragment and trailing slashes, collapses
/// repeated slashes and resolves `.` and `..` segments, percent-encoded
/// ones included. `..` never climbs above the root. The empty path and a
/// path of only slashes both become `/`.
///
/// Already-canonical paths are returned borrowed.
///
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() {
        return Cow::Borrowed("/");
    }

    let canonical = trimmed.starts_with('/')
        && trimmed[1..]
            .split('/')
            .all(|segment| !segment.is_empty() && dot_segment(segment).is_none());
    if canonical {
        return Cow::Borrowed(trimmed);
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        match dot_segment(segment) {
            Some(DotSegment::Current) => {}
            Some(DotSegment::Parent) => {
                segments.pop();
            }
            None => segments.push(segment),
        }
    }
    Cow::Owned(format!("/{}", segments.join("/")))
}

enum DotSegment {
    Current,
    Parent,
}

fn dot_segment(segment: &str) -> Option<DotSegment> {
    if segment.len() > 6 || !segment.starts_with(['.', '%']) {
        return None;
    }
    match segment.to_ascii_lowercase().as_str() {
        "." | "%2e" => Some(DotSegment::Current),
        ".." | ".%2e" | "%2e." | "%2e%2e" => Some(DotSegment::Parent),
        _ => None,
    }
}

/// Whether `prefix` covers `path` on a segment boundary.
pub(crate) fn prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = normalize_path(prefix);
    let path = normalize_path(path);
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix.as_ref()) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether some path would be matched by both prefixes.
pub(crate) fn prefixes_overlap(a: &str, b: &str) -> bool {
    prefix_matches(a, b) || prefix_matches(b, a)
}
