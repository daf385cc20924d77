//! Prometheus metric set shared by all requests, plus the per-request
//! reporter that feeds it.
//!
//! The set is built once at startup and cloned (cheaply, the vectors are
//! internally shared) into every middleware instance. Nothing here blocks:
//! increments and observations are atomic updates inside the prometheus
//! primitives, and `collect()` only copies current values.

use std::collections::HashMap;
use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use thiserror::Error;

use crate::identity::BuildIdentity;

/// Route label for requests that match none of the configured routes.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Outcome code recorded when a request is cancelled mid-flight.
pub const CANCELLED_CODE: u16 = 499;

/// Outcome code recorded when the downstream handler unwinds abnormally.
pub const ABNORMAL_CODE: u16 = 500;

#[derive(Debug, Error)]
pub enum MetricsError {
    /// `register` was called twice without an intervening `unregister`.
    #[error("server metrics are already registered")]
    DuplicateRegistration,
    #[error(transparent)]
    Backend(#[from] prometheus::Error),
}

/// The five server instruments, labeled by route and method (and outcome
/// code for `handled`), with the build identity as constant labels.
#[derive(Clone)]
pub struct ServerMetrics {
    started: IntCounterVec,
    handled: IntCounterVec,
    received: IntCounterVec,
    sent: IntCounterVec,
    duration: HistogramVec,
}

impl ServerMetrics {
    pub fn new(identity: &BuildIdentity) -> Result<Self, MetricsError> {
        let labels: HashMap<String, String> = HashMap::from([
            ("name".to_string(), identity.name.clone()),
            ("version".to_string(), identity.version.clone()),
        ]);

        let started = IntCounterVec::new(
            Opts::new(
                "http_server_started_total",
                "Total number of requests started on the server.",
            )
            .const_labels(labels.clone()),
            &["http_route", "http_method"],
        )?;

        let handled = IntCounterVec::new(
            Opts::new(
                "http_server_handled_total",
                "Total number of requests completed on the server, regardless of success or failure.",
            )
            .const_labels(labels.clone()),
            &["http_route", "http_method", "http_code"],
        )?;

        let received = IntCounterVec::new(
            Opts::new(
                "http_server_msg_received_total",
                "Total number of request messages received on the server.",
            )
            .const_labels(labels.clone()),
            &["http_route", "http_method"],
        )?;

        let sent = IntCounterVec::new(
            Opts::new(
                "http_server_msg_sent_total",
                "Total number of response messages sent by the server.",
            )
            .const_labels(labels.clone()),
            &["http_route", "http_method"],
        )?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "http_server_handling_seconds",
                "Histogram of response latency (seconds) of requests handled by the server.",
            )
            .const_labels(labels),
            &["http_route", "http_method"],
        )?;

        Ok(ServerMetrics {
            started,
            handled,
            received,
            sent,
            duration,
        })
    }

    /// Register the whole set as one collector.
    ///
    /// Registering twice without an intervening [`ServerMetrics::unregister`]
    /// fails with [`MetricsError::DuplicateRegistration`] and leaves the
    /// first registration intact.
    pub fn register(&self, registry: &Registry) -> Result<(), MetricsError> {
        match registry.register(Box::new(self.clone())) {
            Ok(()) => Ok(()),
            Err(prometheus::Error::AlreadyReg) => Err(MetricsError::DuplicateRegistration),
            Err(err) => Err(MetricsError::Backend(err)),
        }
    }

    /// Remove the set from the registry. Safe to call when never registered.
    pub fn unregister(&self, registry: &Registry) {
        if registry.unregister(Box::new(self.clone())).is_err() {
            log::debug!("server metrics were not registered, nothing to remove");
        }
    }

    /// Current `started` count for a route/method pair.
    pub fn started_count(&self, route: &str, method: &str) -> u64 {
        self.started.with_label_values(&[route, method]).get()
    }

    /// Current `handled` count for a route/method/code triple.
    pub fn handled_count(&self, route: &str, method: &str, code: u16) -> u64 {
        self.handled
            .with_label_values(&[route, method, &code.to_string()])
            .get()
    }

    /// Current `received` count for a route/method pair.
    pub fn received_count(&self, route: &str, method: &str) -> u64 {
        self.received.with_label_values(&[route, method]).get()
    }

    /// Current `sent` count for a route/method pair.
    pub fn sent_count(&self, route: &str, method: &str) -> u64 {
        self.sent.with_label_values(&[route, method]).get()
    }

    /// Number of latency observations recorded for a route/method pair.
    pub fn duration_count(&self, route: &str, method: &str) -> u64 {
        self.duration
            .with_label_values(&[route, method])
            .get_sample_count()
    }
}

impl Collector for ServerMetrics {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.started.desc();
        descs.extend(self.handled.desc());
        descs.extend(self.received.desc());
        descs.extend(self.sent.desc());
        descs.extend(self.duration.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.started.collect();
        families.extend(self.handled.collect());
        families.extend(self.received.collect());
        families.extend(self.sent.collect());
        families.extend(self.duration.collect());
        families
    }
}

/// Per-request accumulator. Construction increments `started`; the drop
/// guard guarantees exactly one `handled` observation on every exit path,
/// including cancellation and unwinding panics.
pub struct Reporter {
    metrics: ServerMetrics,
    route: String,
    method: String,
    start: Instant,
    finalized: bool,
}

impl Reporter {
    pub fn new(
        metrics: ServerMetrics,
        route: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        let route = route.into();
        let method = method.into();
        metrics.started.with_label_values(&[&route, &method]).inc();
        Reporter {
            metrics,
            route,
            method,
            start: Instant::now(),
            finalized: false,
        }
    }

    pub fn received_message(&self) {
        self.metrics
            .received
            .with_label_values(&[&self.route, &self.method])
            .inc();
    }

    pub fn sent_message(&self) {
        self.metrics
            .sent
            .with_label_values(&[&self.route, &self.method])
            .inc();
    }

    /// Record the terminal outcome and the elapsed latency. Finalizes the
    /// reporter; later drops record nothing further.
    pub fn handled(&mut self, code: u16) {
        self.finalized = true;
        self.metrics
            .handled
            .with_label_values(&[&self.route, &self.method, &code.to_string()])
            .inc();
        self.metrics
            .duration
            .with_label_values(&[&self.route, &self.method])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        // Reached when the request future is dropped before completion
        // (client went away, timeout upstream) or the handler panicked.
        let code = if std::thread::panicking() {
            ABNORMAL_CODE
        } else {
            CANCELLED_CODE
        };
        self.handled(code);
    }
}
