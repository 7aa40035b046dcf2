//! Metrics collection and exposition.
//!
//! # Metrics
//! - `version_dispatch_total` (counter): dispatches by outcome, group, version
//! - `version_deprecated_served_total` (counter): responses served by a deprecated version
//! - `version_dispatch_duration_seconds` (histogram): negotiation + handler latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - Labels stay low-cardinality: no paths, no request ids

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::{DispatchOutcome, DispatchRecord};

pub const DISPATCH_TOTAL: &str = "version_dispatch_total";
pub const DEPRECATED_SERVED_TOTAL: &str = "version_deprecated_served_total";
pub const DISPATCH_DURATION: &str = "version_dispatch_duration_seconds";

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Dispatched requests by outcome, group and version");
    describe_counter!(
        DEPRECATED_SERVED_TOTAL,
        "Responses served by a deprecated version"
    );
    describe_histogram!(
        DISPATCH_DURATION,
        Unit::Seconds,
        "Time from dispatch start to handler response"
    );
}

/// Record one completed dispatch.
pub fn record_dispatch(record: &DispatchRecord, elapsed: Duration) {
    let group = record.group.clone().unwrap_or_else(|| "none".to_string());
    let version = record
        .resolved_version
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string());
    let outcome = record.outcome.as_str();

    counter!(
        DISPATCH_TOTAL,
        "outcome" => outcome,
        "group" => group.clone(),
        "version" => version.clone()
    )
    .increment(1);
    histogram!(DISPATCH_DURATION, "outcome" => outcome).record(elapsed.as_secs_f64());

    if record.outcome == DispatchOutcome::ServedDeprecated {
        counter!(DEPRECATED_SERVED_TOTAL, "group" => group, "version" => version).increment(1);
    }
}
