//! Rollout decisions.
//!
//! A client's pipeline is derived from an FNV-1a hash of its identity and
//! never stored. The same identity lands in the same bucket on every
//! instance and after every restart.

use {
    crate::{AnonymousKey, RolloutConfig, gate::session::{RequestCookies, SessionStatus}},
    std::{collections::HashSet, fmt},
};

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a.
///
/// ```
/// use edge_gate::fnv1a32;
///
/// assert_eq!(fnv1a32(b""), 0x811C_9DC5);
/// assert_eq!(fnv1a32(b"a"), 0xE40C_292C);
/// ```
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Bucket in `0..100` for a client key.
pub fn bucket_for(key: &str) -> u8 {
    (fnv1a32(key.as_bytes()) % 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    New,
    Legacy,
}

impl Pipeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::New => "new",
            Pipeline::Legacy => "legacy",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    RolloutDisabled,
    RouteNotEligible,
    WithinPercentage,
    OutsidePercentage,
    /// The gate could not complete its decision and fell back to legacy.
    GateFallback,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::RolloutDisabled => "rollout disabled",
            DecisionReason::RouteNotEligible => "route not eligible",
            DecisionReason::WithinPercentage => "within rollout percentage",
            DecisionReason::OutsidePercentage => "outside rollout percentage",
            DecisionReason::GateFallback => "gate fallback",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline renders a request, and why. Also inserted into the request
/// extensions for downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutDecision {
    pub pipeline: Pipeline,
    pub reason: DecisionReason,
    /// Only set when the client was actually bucketed.
    pub bucket: Option<u8>,
}

impl RolloutDecision {
    pub fn legacy(reason: DecisionReason) -> Self {
        Self {
            pipeline: Pipeline::Legacy,
            reason,
            bucket: None,
        }
    }

    pub fn use_new_pipeline(&self) -> bool {
        self.pipeline == Pipeline::New
    }
}

/// The identity a client is bucketed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKey {
    /// Id from a validated user record.
    User(String),
    /// Value of the anonymous-client cookie.
    Anonymous(String),
    /// Salted request path; used when `anonymous_key = "path"`.
    Path(String),
}

impl ClientKey {
    pub fn hash_input(&self) -> String {
        match self {
            ClientKey::User(id) => format!("user:{id}"),
            ClientKey::Anonymous(id) => format!("anon:{id}"),
            ClientKey::Path(salted) => salted.clone(),
        }
    }

    pub fn bucket(&self) -> u8 {
        bucket_for(&self.hash_input())
    }
}

/// A client key plus the anonymous id that has to be handed to the client,
/// if one was minted for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedClient {
    pub key: ClientKey,
    pub minted: Option<String>,
}

/// Anonymous ids longer than this, or containing anything but
/// `[A-Za-z0-9-]`, are replaced.
const MAX_ANONYMOUS_ID_LEN: usize = 64;

///
/// Rollout settings resolved once at startup.
///
#[derive(Debug, Clone)]
pub struct RolloutEngine {
    enabled: bool,
    percentage: u8,
    eligible: HashSet<String>,
    anonymous_key: AnonymousKey,
    anonymous_cookie: String,
    path_salt: String,
}

impl RolloutEngine {
    pub fn new(config: &RolloutConfig) -> Self {
        Self {
            enabled: config.enabled,
            percentage: config.effective_percentage(),
            eligible: config.eligible_route_groups.iter().cloned().collect(),
            anonymous_key: config.anonymous_key,
            anonymous_cookie: config.anonymous_cookie.clone(),
            path_salt: config.path_salt.clone(),
        }
    }

    pub fn anonymous_cookie(&self) -> &str {
        &self.anonymous_cookie
    }

    /// Whether a request in `route_group` would be bucketed at all.
    pub fn is_active_for(&self, route_group: Option<&str>) -> bool {
        self.enabled && route_group.is_some_and(|group| self.eligible.contains(group))
    }

    /// Decides the pipeline for an already known client key.
    pub fn decide(&self, path: &str, route_group: Option<&str>, key: &ClientKey) -> RolloutDecision {
        self.decide_with(path, route_group, || key.clone())
    }

    ///
    /// Decides the pipeline, asking for the client key only when the
    /// request is actually bucketed: disabled rollouts and ineligible routes
    /// never touch the client identity.
    ///
    pub fn decide_with<F>(&self, path: &str, route_group: Option<&str>, key: F) -> RolloutDecision
    where
        F: FnOnce() -> ClientKey,
    {
        if !self.enabled {
            return RolloutDecision::legacy(DecisionReason::RolloutDisabled);
        }
        if !self.is_active_for(route_group) {
            return RolloutDecision::legacy(DecisionReason::RouteNotEligible);
        }

        let bucket = key().bucket();
        let (pipeline, reason) = if bucket < self.percentage {
            (Pipeline::New, DecisionReason::WithinPercentage)
        } else {
            (Pipeline::Legacy, DecisionReason::OutsidePercentage)
        };
        tracing::trace!(path, bucket, pipeline = %pipeline, "Client bucketed");

        RolloutDecision {
            pipeline,
            reason,
            bucket: Some(bucket),
        }
    }

    ///
    /// Picks the client key: the user id for a valid session, otherwise the
    /// anonymous cookie (minting a new id when it is missing or unusable),
    /// or the salted path when so configured.
    ///
    pub fn resolve_client(
        &self,
        session: &SessionStatus,
        cookies: &RequestCookies,
        path: &str,
    ) -> ResolvedClient {
        if let Some(id) = session.user_id() {
            return ResolvedClient {
                key: ClientKey::User(id.to_string()),
                minted: None,
            };
        }

        match self.anonymous_key {
            AnonymousKey::Path => ResolvedClient {
                key: ClientKey::Path(format!("{}:{}", self.path_salt, path)),
                minted: None,
            },
            AnonymousKey::Cookie => match cookies
                .get(&self.anonymous_cookie)
                .filter(|id| is_plausible_anonymous_id(id))
            {
                Some(id) => ResolvedClient {
                    key: ClientKey::Anonymous(id.to_string()),
                    minted: None,
                },
                None => {
                    let id = crate::utils::mint_client_id();
                    ResolvedClient {
                        key: ClientKey::Anonymous(id.clone()),
                        minted: Some(id),
                    }
                }
            },
        }
    }
}

fn is_plausible_anonymous_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ANONYMOUS_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Free-function form of [`RolloutEngine::decide`].
pub fn decide(
    path: &str,
    route_group: Option<&str>,
    config: &RolloutConfig,
    client_key: &ClientKey,
) -> RolloutDecision {
    RolloutEngine::new(config).decide(path, route_group, client_key)
}
