use {
    crate::{Result, SecurityHeadersConfig},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method,
        header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
};

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
pub const X_CSRF_PROTECTION: HeaderName = HeaderName::from_static("x-csrf-protection");

/// POST, PUT, PATCH and DELETE.
pub fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

///
/// Baseline security headers, validated once and cloned onto each response.
///
#[derive(Debug, Clone)]
pub struct HeaderComposer {
    baseline: HeaderMap,
    csrf_marker: bool,
}

impl HeaderComposer {
    pub fn new(config: &SecurityHeadersConfig) -> Result<Self> {
        let mut baseline = HeaderMap::new();
        baseline.insert(
            X_FRAME_OPTIONS,
            HeaderValue::from_str(&config.x_frame_options.0.to_string())?,
        );
        if config.x_content_type_nosniff {
            baseline.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        }
        if !config.referrer_policy.is_empty() {
            baseline.insert(REFERRER_POLICY, HeaderValue::from_str(&config.referrer_policy)?);
        }
        if !config.permissions_policy.is_empty() {
            baseline.insert(
                PERMISSIONS_POLICY,
                HeaderValue::from_str(&config.permissions_policy)?,
            );
        }

        Ok(Self {
            baseline,
            csrf_marker: config.csrf_marker,
        })
    }

    /// Headers for a response to a `method` request.
    pub fn compose(&self, method: &Method) -> HeaderMap {
        let mut headers = self.baseline.clone();
        if self.csrf_marker && is_state_changing(method) {
            headers.insert(X_CSRF_PROTECTION, HeaderValue::from_static("1"));
        }
        headers
    }
}

/// Writes `headers` into `target`, replacing any values already there.
pub(crate) fn overwrite_headers(target: &mut HeaderMap, headers: HeaderMap) {
    for (name, value) in headers {
        if let Some(name) = name {
            target.insert(name, value);
        }
    }
}
