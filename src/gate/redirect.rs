use {
    crate::{Error, GateConfig, HttpConfig, Result},
    http::{HeaderMap, Uri, header::HOST},
    url::Url,
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

///
/// Builds redirect targets for denied requests.
///
/// Targets always point at the request's own origin; only the path and
/// query are replaced. The original destination travels in the redirect
/// parameter and survives the round trip byte for byte.
///
/// ```
/// use edge_gate::{GateConfig, HttpConfig, RedirectBuilder};
/// use url::Url;
///
/// let builder = RedirectBuilder::new(&GateConfig::default(), &HttpConfig::default()).unwrap();
/// let base = Url::parse("https://shop.example.com/").unwrap();
///
/// let login = builder.build_login_redirect("/cart?coupon=a&b", &base).unwrap();
/// assert_eq!(login.path(), "/auth/login");
/// let (_, original) = login.query_pairs().next().unwrap();
/// assert_eq!(original, "/cart?coupon=a&b");
/// ```
///
#[derive(Debug, Clone)]
pub struct RedirectBuilder {
    login_path: String,
    landing_path: String,
    redirect_param: String,
    fallback_base: Url,
    trust_forwarded_proto: bool,
}

impl RedirectBuilder {
    pub fn new(gate: &GateConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            login_path: gate.login_path.clone(),
            landing_path: gate.landing_path.clone(),
            redirect_param: gate.redirect_param.clone(),
            fallback_base: http.public_base_url()?,
            trust_forwarded_proto: http.trust_forwarded_proto,
        })
    }

    /// `login_path?<redirect_param>=<original>` on the request's origin.
    pub fn build_login_redirect(&self, original: &str, base_url: &Url) -> Result<Url> {
        let mut url = self.at_path(base_url, &self.login_path)?;
        url.query_pairs_mut()
            .append_pair(&self.redirect_param, original);
        Ok(url)
    }

    pub fn build_default_landing_redirect(&self, base_url: &Url) -> Result<Url> {
        self.at_path(base_url, &self.landing_path)
    }

    fn at_path(&self, base_url: &Url, path: &str) -> Result<Url> {
        if base_url.cannot_be_a_base() {
            return Err(Error::redirect_construction(format!(
                "{base_url} cannot carry a path"
            )));
        }
        let mut url = base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    ///
    /// The origin the request was sent to, taken from the `Host` header (or
    /// the URI authority for absolute-form and HTTP/2 requests).
    ///
    /// The scheme is the configured one unless `X-Forwarded-Proto` is
    /// trusted. Anything that does not parse as a bare origin falls back to
    /// `public_base_url`.
    ///
    pub fn request_base_url(&self, headers: &HeaderMap, uri: &Uri) -> Url {
        let host = headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| uri.authority().map(|a| a.as_str()));

        let Some(host) = host else {
            return self.fallback_base.clone();
        };

        let scheme = self
            .forwarded_scheme(headers)
            .unwrap_or_else(|| self.fallback_base.scheme());

        match Url::parse(&format!("{scheme}://{host}/")) {
            Ok(url) if is_bare_origin(&url) => url,
            _ => {
                tracing::debug!("Unusable Host header, using public_base_url for redirects");
                self.fallback_base.clone()
            }
        }
    }

    fn forwarded_scheme<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
        if !self.trust_forwarded_proto {
            return None;
        }
        let value = headers.get(FORWARDED_PROTO)?.to_str().ok()?;
        // Proxy chains append; the first entry is the client-facing hop.
        let first = value.split(',').next()?.trim();
        match first {
            "http" => Some("http"),
            "https" => Some("https"),
            _ => None,
        }
    }
}

fn is_bare_origin(url: &Url) -> bool {
    url.host_str().is_some()
        && url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    fn builder() -> RedirectBuilder {
        RedirectBuilder::new(&GateConfig::default(), &HttpConfig::default()).unwrap()
    }

    fn base() -> Url {
        Url::parse("https://shop.example.com:8443/").unwrap()
    }

    fn redirect_value(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == "redirect")
            .map(|(_, v)| v.into_owned())
            .expect("redirect parameter present")
    }

    #[test]
    fn test_login_redirect_keeps_origin() {
        let url = builder()
            .build_login_redirect("/dashboard", &base())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://shop.example.com:8443/auth/login?redirect=%2Fdashboard"
        );
    }

    #[test]
    fn test_login_redirect_ignores_base_path_and_query() {
        let base = Url::parse("http://localhost:3000/some/page?x=1#frag").unwrap();
        let url = builder().build_login_redirect("/cart", &base).unwrap();
        assert_eq!(url.path(), "/auth/login");
        assert_eq!(url.query_pairs().count(), 1);
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_landing_redirect() {
        let url = builder().build_default_landing_redirect(&base()).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com:8443/dashboard");
    }

    #[test]
    fn test_cannot_be_a_base_is_an_error() {
        let base = Url::parse("mailto:ops@example.com").unwrap();
        let err = builder().build_default_landing_redirect(&base).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RedirectConstruction);
    }

    #[test]
    fn test_request_base_url_from_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("shop.example.com:8080"));
        let url = builder().request_base_url(&headers, &Uri::from_static("/cart"));
        assert_eq!(url.as_str(), "http://shop.example.com:8080/");
    }

    #[test]
    fn test_request_base_url_from_absolute_uri() {
        let url = builder().request_base_url(
            &HeaderMap::new(),
            &Uri::from_static("http://edge.internal/cart"),
        );
        assert_eq!(url.host_str(), Some("edge.internal"));
    }

    #[test]
    fn test_request_base_url_falls_back() {
        let builder = builder();
        let url = builder.request_base_url(&HeaderMap::new(), &Uri::from_static("/"));
        assert_eq!(url.as_str(), "http://localhost:3000/");

        for bad in ["evil.com/path", "user@evil.com", "a b", ""] {
            let mut headers = HeaderMap::new();
            headers.insert(HOST, HeaderValue::from_str(bad).unwrap());
            let url = builder.request_base_url(&headers, &Uri::from_static("/"));
            assert_eq!(url.as_str(), "http://localhost:3000/", "{bad}");
        }
    }

    #[test]
    fn test_forwarded_proto_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("shop.example.com"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https, http"));

        let untrusted = builder().request_base_url(&headers, &Uri::from_static("/"));
        assert_eq!(untrusted.scheme(), "http");

        let http = HttpConfig {
            trust_forwarded_proto: true,
            ..Default::default()
        };
        let trusted = RedirectBuilder::new(&GateConfig::default(), &http)
            .unwrap()
            .request_base_url(&headers, &Uri::from_static("/"));
        assert_eq!(trusted.as_str(), "https://shop.example.com/");
    }

    #[test]
    fn test_reserved_characters_round_trip() {
        let original = "/search?q=a b&c=d/e#x+%";
        let url = builder().build_login_redirect(original, &base()).unwrap();
        assert!(!url.as_str().contains(' '));
        assert_eq!(redirect_value(&url), original);
    }

    proptest! {
        #[test]
        fn redirect_parameter_round_trips(original in "/[ -~]{0,60}") {
            let url = builder().build_login_redirect(&original, &base()).unwrap();
            prop_assert_eq!(url.host_str(), Some("shop.example.com"));
            prop_assert_eq!(url.path(), "/auth/login");
            prop_assert_eq!(redirect_value(&url), original);
        }

        #[test]
        fn round_trip_survives_reparse(original in "/[^\\x00-\\x1f]{0,40}") {
            let url = builder().build_login_redirect(&original, &base()).unwrap();
            let reparsed = Url::parse(url.as_str()).unwrap();
            prop_assert_eq!(redirect_value(&reparsed), original);
        }
    }
}
