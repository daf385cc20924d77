//! Actix middleware that observes every request against the shared metric
//! set without altering its outcome.
//!
//! The wrapped service is called with no lock held; the only shared state
//! is the atomics inside the prometheus vectors. Probe paths bypass
//! instrumentation entirely so synthetic traffic never skews the signals.

use std::ops::RangeInclusive;
use std::sync::Arc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::Error;
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::config;
use crate::metrics::{Reporter, ServerMetrics, UNMATCHED_ROUTE};

/// The bounded universe of route label values.
///
/// Patterns are path templates in actix syntax, e.g. `/api/items/{id}`; a
/// `{...}` segment matches any single path segment. Request paths resolve
/// to the pattern they match, or to [`UNMATCHED_ROUTE`], so label
/// cardinality can never exceed the configured set plus one.
#[derive(Clone, Default)]
pub struct RouteSet {
    patterns: Arc<Vec<String>>,
}

impl RouteSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RouteSet {
            patterns: Arc::new(patterns.into_iter().map(Into::into).collect()),
        }
    }

    /// Map a request path to its route label.
    pub fn resolve(&self, path: &str) -> &str {
        self.patterns
            .iter()
            .find(|p| pattern_matches(p, path))
            .map(String::as_str)
            .unwrap_or(UNMATCHED_ROUTE)
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pat: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let seg: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    pat.len() == seg.len()
        && pat
            .iter()
            .zip(&seg)
            .all(|(p, s)| (p.starts_with('{') && p.ends_with('}')) || p == s)
}

/// Method label drawn from the closed verb set; anything exotic collapses
/// to `other` so the label stays bounded.
fn method_label(method: &actix_web::http::Method) -> &'static str {
    match method.as_str() {
        "GET" => "get",
        "POST" => "post",
        "PUT" => "put",
        "DELETE" => "delete",
        "PATCH" => "patch",
        "HEAD" => "head",
        "OPTIONS" => "options",
        "CONNECT" => "connect",
        "TRACE" => "trace",
        _ => "other",
    }
}

/// Terminal status of one request as seen by the middleware.
///
/// Defaults to 200 until the downstream service reports otherwise; the last
/// status set wins.
#[derive(Debug)]
struct OutcomeCapture {
    code: StatusCode,
}

impl OutcomeCapture {
    fn new() -> Self {
        OutcomeCapture {
            code: StatusCode::OK,
        }
    }

    fn set(&mut self, code: StatusCode) {
        self.code = code;
    }

    fn code(&self) -> StatusCode {
        self.code
    }
}

type ProbeFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Middleware factory. Wraps any handler stack into an equivalent one that
/// additionally feeds the shared [`ServerMetrics`].
#[derive(Clone)]
pub struct RequestMetrics {
    metrics: ServerMetrics,
    routes: RouteSet,
    probe: ProbeFilter,
    success: RangeInclusive<u16>,
}

impl RequestMetrics {
    /// Build a middleware around a metric set, with probe paths and the
    /// success-class range taken from [`config::settings`].
    pub fn new(metrics: ServerMetrics) -> Self {
        let settings = config::settings();
        let probes = settings.probe_paths.clone();
        RequestMetrics {
            metrics,
            routes: RouteSet::default(),
            probe: Arc::new(move |path| probes.iter().any(|p| p == path)),
            success: settings.success_min..=settings.success_max,
        }
    }

    /// Set the bounded route universe used for route labels.
    pub fn routes(mut self, routes: RouteSet) -> Self {
        self.routes = routes;
        self
    }

    /// Replace the probe-path predicate. Matching requests are delegated
    /// untouched and contribute to no metric.
    pub fn probe_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.probe = Arc::new(filter);
        self
    }

    /// Override the contiguous status range counted as success.
    pub fn success_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.success = range;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestMetricsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsMiddleware {
            service,
            metrics: self.metrics.clone(),
            routes: self.routes.clone(),
            probe: self.probe.clone(),
            success: self.success.clone(),
        }))
    }
}

pub struct RequestMetricsMiddleware<S> {
    service: S,
    metrics: ServerMetrics,
    routes: RouteSet,
    probe: ProbeFilter,
    success: RangeInclusive<u16>,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if (self.probe.as_ref())(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let route = self.routes.resolve(req.path()).to_owned();
        let method = method_label(req.method());
        let mut reporter = Reporter::new(self.metrics.clone(), route, method);
        reporter.received_message();

        let success = self.success.clone();
        let fut = self.service.call(req);

        Box::pin(async move {
            let mut outcome = OutcomeCapture::new();
            let result = fut.await;
            match &result {
                Ok(res) => outcome.set(res.status()),
                Err(err) => outcome.set(err.as_response_error().status_code()),
            }

            let code = outcome.code().as_u16();
            reporter.handled(code);
            if success.contains(&code) {
                reporter.sent_message();
            }

            result
        })
    }
}
