//! The gate itself: classification, session check, rollout decision and
//! response shaping for one request.
//!
//! [`EdgeGate::evaluate`] is pure and returns a [`GateOutcome`];
//! [`edge_gate_middleware`] applies that outcome to an axum request.

use {
    super::{
        classifier::{RouteClass, RouteTable, normalize_path},
        headers::{HeaderComposer, overwrite_headers},
        redirect::RedirectBuilder,
        rollout::{DecisionReason, Pipeline, RolloutDecision, RolloutEngine},
        session::{RequestCookies, SessionStatus, SessionValidator},
    },
    crate::{Config, Result},
    axum::{
        extract::Request,
        http::{
            HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
            header::{LOCATION, SET_COOKIE},
            request::Parts,
        },
        middleware::Next,
        response::{IntoResponse, Response},
    },
    cookie::{Cookie, SameSite},
    std::{borrow::Cow, fmt, sync::Arc},
    tokio::sync::mpsc,
    url::Url,
};

/// Request header telling downstream renderers which pipeline to use.
pub const RENDER_PIPELINE_HEADER: HeaderName = HeaderName::from_static("x-render-pipeline");

const ANONYMOUS_COOKIE_MAX_AGE_DAYS: i64 = 365;

/// What the gate needs to know about a request.
#[derive(Debug, Clone)]
pub struct GateRequest {
    pub method: Method,
    /// Path and query as sent.
    pub target: String,
    pub cookies: RequestCookies,
    /// Origin the request was addressed to; redirects never leave it.
    pub base_url: Url,
}

impl GateRequest {
    pub fn new(method: Method, target: impl Into<String>, base_url: Url) -> Self {
        Self {
            method,
            target: target.into(),
            cookies: RequestCookies::default(),
            base_url,
        }
    }

    pub fn with_cookies(mut self, cookies: RequestCookies) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn from_parts(parts: &Parts, base_url: Url) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Self {
            method: parts.method.clone(),
            target: target.to_string(),
            cookies: RequestCookies::from_headers(&parts.headers),
            base_url,
        }
    }

    /// Normalized path, without the query. Dot segments and repeated
    /// slashes are resolved, so classification sees what an origin would
    /// serve.
    pub fn path(&self) -> Cow<'_, str> {
        normalize_path(&self.target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Protected route without a valid session.
    SessionRequired,
    /// Auth route with a valid session.
    AlreadyAuthenticated,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::SessionRequired => "session required",
            DenialReason::AlreadyAuthenticated => "already authenticated",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authorized request on its way to a renderer.
#[derive(Debug, Clone)]
pub struct PassThrough {
    pub decision: RolloutDecision,
    pub route_class: RouteClass,
    pub route_group: Option<String>,
    pub authenticated: bool,
    /// Added to the response, replacing values set by the renderer.
    pub headers: HeaderMap,
    /// `Set-Cookie` for a freshly minted anonymous id.
    pub set_cookie: Option<HeaderValue>,
}

#[derive(Debug, Clone)]
pub enum GateOutcome {
    PassThrough(PassThrough),
    Redirect {
        location: Url,
        reason: DenialReason,
        headers: HeaderMap,
    },
    /// Excluded route; the request is forwarded untouched.
    Bypass,
}

impl GateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateOutcome::PassThrough(_) => "pass-through",
            GateOutcome::Redirect { .. } => "redirect",
            GateOutcome::Bypass => "bypass",
        }
    }

    pub fn decision(&self) -> Option<&RolloutDecision> {
        match self {
            GateOutcome::PassThrough(pass) => Some(&pass.decision),
            _ => None,
        }
    }
}

/// Emitted for every request that reaches a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSelectionEvent {
    pub path: String,
    pub route_group: Option<String>,
    pub pipeline: Pipeline,
    pub reason: DecisionReason,
    pub authenticated: bool,
}

///
/// Per-deployment gate built once from [`Config`] and shared read-only
/// between requests.
///
#[derive(Debug, Clone)]
pub struct EdgeGate {
    routes: RouteTable,
    sessions: SessionValidator,
    rollout: RolloutEngine,
    redirects: RedirectBuilder,
    headers: HeaderComposer,
    events: Option<mpsc::Sender<PipelineSelectionEvent>>,
}

impl EdgeGate {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            routes: RouteTable::from_config(config),
            sessions: SessionValidator::new(&config.gate.session),
            rollout: RolloutEngine::new(&config.rollout),
            redirects: RedirectBuilder::new(&config.gate, &config.http)?,
            headers: HeaderComposer::new(&config.http.security_headers)?,
            events: None,
        })
    }

    ///
    /// Sends a [`PipelineSelectionEvent`] for every pass-through. Sending
    /// never waits: when the channel is full or closed the event is dropped.
    ///
    pub fn with_event_sender(mut self, sender: mpsc::Sender<PipelineSelectionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn request_from_parts(&self, parts: &Parts) -> GateRequest {
        let base_url = self.redirects.request_base_url(&parts.headers, &parts.uri);
        GateRequest::from_parts(parts, base_url)
    }

    ///
    /// Decides what happens to `request`:
    ///
    /// - excluded route: [`GateOutcome::Bypass`]
    /// - protected route without a valid session: redirect to login, carrying
    ///   the original target
    /// - auth route with a valid session: redirect to the landing route
    /// - everything else: pass through with a pipeline decision and the
    ///   security headers
    ///
    /// A redirect that cannot be built degrades to a legacy pass-through.
    ///
    pub fn evaluate(&self, request: &GateRequest) -> GateOutcome {
        let path = request.path();
        let path = path.as_ref();
        let route_class = self.routes.classify_path(path);

        if route_class == RouteClass::Excluded {
            tracing::trace!(path, "Excluded route, gate bypassed");
            return GateOutcome::Bypass;
        }

        let route_group = self.routes.route_group(path);
        let needs_session = matches!(route_class, RouteClass::Protected | RouteClass::Auth)
            || self.rollout.is_active_for(route_group);
        let session = needs_session.then(|| self.sessions.inspect(&request.cookies));
        let authenticated = session.as_ref().is_some_and(SessionStatus::is_valid);
        let session_label = session.as_ref().map_or("unchecked", SessionStatus::as_str);

        let denial = match route_class {
            RouteClass::Protected if !authenticated => Some(DenialReason::SessionRequired),
            RouteClass::Auth if authenticated => Some(DenialReason::AlreadyAuthenticated),
            _ => None,
        };

        if let Some(reason) = denial {
            let location = match reason {
                DenialReason::SessionRequired => self
                    .redirects
                    .build_login_redirect(&request.target, &request.base_url),
                DenialReason::AlreadyAuthenticated => self
                    .redirects
                    .build_default_landing_redirect(&request.base_url),
            };

            match location {
                Ok(location) => {
                    tracing::debug!(
                        path,
                        route_class = %route_class,
                        session = %session_label,
                        outcome = "redirect",
                        reason = %reason,
                        "Gate evaluated"
                    );
                    return GateOutcome::Redirect {
                        location,
                        reason,
                        headers: self.headers.compose(&request.method),
                    };
                }
                Err(e) => {
                    tracing::error!(
                        path,
                        error = %e,
                        "Redirect could not be built, passing request through"
                    );
                    return GateOutcome::PassThrough(self.fallback(request));
                }
            }
        }

        let mut minted = None;
        let decision = self.rollout.decide_with(path, route_group, || {
            let resolved = self.rollout.resolve_client(
                session.as_ref().unwrap_or(&SessionStatus::Absent),
                &request.cookies,
                path,
            );
            minted = resolved.minted;
            resolved.key
        });

        tracing::debug!(
            path,
            route_class = %route_class,
            session = %session_label,
            outcome = "pass-through",
            pipeline = %decision.pipeline,
            reason = %decision.reason,
            "Gate evaluated"
        );

        let pass = PassThrough {
            decision,
            route_class,
            route_group: route_group.map(String::from),
            authenticated,
            headers: self.headers.compose(&request.method),
            set_cookie: minted.and_then(|id| self.anonymous_cookie(&id, &request.base_url)),
        };
        self.publish(path, &pass);
        GateOutcome::PassThrough(pass)
    }

    /// Legacy pass-through used when the gate cannot finish a decision.
    pub fn fallback(&self, request: &GateRequest) -> PassThrough {
        let path = request.path();
        let path = path.as_ref();
        let route_class = self.routes.classify_path(path);
        let pass = PassThrough {
            decision: RolloutDecision::legacy(DecisionReason::GateFallback),
            route_class,
            route_group: self.routes.route_group(path).map(String::from),
            authenticated: false,
            headers: self.headers.compose(&request.method),
            set_cookie: None,
        };
        self.publish(path, &pass);
        pass
    }

    fn anonymous_cookie(&self, id: &str, base_url: &Url) -> Option<HeaderValue> {
        let cookie = Cookie::build((self.rollout.anonymous_cookie(), id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(base_url.scheme() == "https")
            .max_age(cookie::time::Duration::days(ANONYMOUS_COOKIE_MAX_AGE_DAYS))
            .build();
        HeaderValue::from_str(&cookie.to_string()).ok()
    }

    fn publish(&self, path: &str, pass: &PassThrough) {
        let Some(events) = &self.events else {
            return;
        };
        let event = PipelineSelectionEvent {
            path: path.to_string(),
            route_group: pass.route_group.clone(),
            pipeline: pass.decision.pipeline,
            reason: pass.decision.reason,
            authenticated: pass.authenticated,
        };
        if let Err(e) = events.try_send(event) {
            tracing::trace!(error = %e, "Pipeline selection event dropped");
        }
    }
}

/// Axum middleware applying [`EdgeGate::evaluate`] to each request.
///
/// Pass-through requests get `x-render-pipeline` (replacing any value the
/// client sent) and a [`RolloutDecision`] extension; their responses get the
/// security headers. Denied requests are answered with `307` here and
/// never reach the inner service.
pub async fn edge_gate_middleware(gate: Arc<EdgeGate>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let gate_request = gate.request_from_parts(&parts);

    let pass = match gate.evaluate(&gate_request) {
        GateOutcome::Bypass => return next.run(Request::from_parts(parts, body)).await,
        GateOutcome::Redirect {
            location, headers, ..
        } => match HeaderValue::from_str(location.as_str()) {
            Ok(location) => return redirect_response(location, headers),
            Err(e) => {
                tracing::error!(error = %e, "Redirect target is not a valid header value");
                gate.fallback(&gate_request)
            }
        },
        GateOutcome::PassThrough(pass) => pass,
    };

    // No-op unless an enclosing `http_request` span declares the field.
    tracing::Span::current().record("pipeline", pass.decision.pipeline.as_str());
    parts.headers.insert(
        RENDER_PIPELINE_HEADER,
        HeaderValue::from_static(pass.decision.pipeline.as_str()),
    );
    parts.extensions.insert(pass.decision);

    let mut response = next.run(Request::from_parts(parts, body)).await;
    let response_headers = response.headers_mut();
    overwrite_headers(response_headers, pass.headers);
    if let Some(cookie) = pass.set_cookie {
        response_headers.append(SET_COOKIE, cookie);
    }
    response
}

fn redirect_response(location: HeaderValue, headers: HeaderMap) -> Response {
    let mut response = StatusCode::TEMPORARY_REDIRECT.into_response();
    let response_headers = response.headers_mut();
    response_headers.extend(headers);
    response_headers.insert(LOCATION, location);
    response
}
