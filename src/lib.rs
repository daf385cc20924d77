//! Request instrumentation for actix-web services.
//!
//! One [`metrics::ServerMetrics`] instance is built at startup, registered
//! with a prometheus [`Registry`](prometheus::Registry), and cloned into a
//! [`middleware::RequestMetrics`] layer that observes every request without
//! altering its outcome.

pub mod config;
pub mod http;
pub mod identity;
pub mod metrics;
pub mod middleware;

pub use identity::BuildIdentity;
pub use metrics::{MetricsError, Reporter, ServerMetrics};
pub use middleware::{RequestMetrics, RouteSet};
