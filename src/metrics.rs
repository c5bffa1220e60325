// =============================================================================
// METRICS MODULE
// =============================================================================
// Prometheus metrics for the sync path.
//
// NOTES:
// - The core always records through the `metrics` macros; without an
//   installed recorder they are no-ops (CLI commands, tests)
// - Auto mode installs the Prometheus exporter, optionally with an HTTP
//   listener serving /metrics
// =============================================================================

use std::net::SocketAddr;

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

// =============================================================================
// METRIC NAMES (Constants)
// =============================================================================

/// Outbound API request counter
/// Labels: method (GET/POST/PUT), status (200/404/transport_error)
pub const REMOTE_REQUESTS_TOTAL: &str = "remote_requests_total";

/// Outbound API request duration histogram
/// Labels: method
pub const REMOTE_REQUEST_DURATION_SECONDS: &str = "remote_request_duration_seconds";

/// Per-item push outcomes
/// Labels: outcome (created/updated/failed)
pub const SYNC_ITEMS_TOTAL: &str = "sync_items_total";

/// Coffees in the catalog at the last push or pull
pub const CATALOG_COFFEES: &str = "catalog_coffees";

/// File change events seen by the watcher
/// Labels: decision (accepted/dropped)
pub const WATCHER_EVENTS_TOTAL: &str = "watcher_events_total";

// =============================================================================
// SETUP FUNCTION
// =============================================================================
/// Install the Prometheus recorder.
///
/// With `listen` set, an HTTP listener serves the exposition format on
/// that address. Must be called from inside a Tokio runtime.
pub fn setup_metrics(listen: Option<SocketAddr>) -> Result<()> {
    let latency_buckets = &[
        0.005, // 5ms
        0.01,  // 10ms
        0.025, // 25ms
        0.05,  // 50ms
        0.1,   // 100ms
        0.25,  // 250ms
        0.5,   // 500ms
        1.0,   // 1 second
        2.5,   // 2.5 seconds
        5.0,   // 5 seconds
        10.0,  // 10 seconds
        30.0,  // request timeout territory
    ];

    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(REMOTE_REQUEST_DURATION_SECONDS.to_string()),
        latency_buckets,
    )?;

    match listen {
        Some(addr) => builder.with_http_listener(addr).install()?,
        None => {
            builder.install_recorder()?;
        }
    }

    describe_counter!(REMOTE_REQUESTS_TOTAL, "Requests sent to the remote inventory API");
    describe_histogram!(
        REMOTE_REQUEST_DURATION_SECONDS,
        "Remote inventory API latency in seconds"
    );
    describe_counter!(SYNC_ITEMS_TOTAL, "Coffees pushed to the remote API by outcome");
    describe_gauge!(CATALOG_COFFEES, "Number of coffees in the local catalog");
    describe_counter!(WATCHER_EVENTS_TOTAL, "Catalog file change events by debounce decision");

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Record one outbound request. `status` is the HTTP status, or `None` when
/// no response came back.
pub fn record_remote_request(method: &str, status: Option<u16>, duration_secs: f64) {
    let status = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "transport_error".to_string());
    counter!(
        REMOTE_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        REMOTE_REQUEST_DURATION_SECONDS,
        "method" => method.to_string()
    )
    .record(duration_secs);
}

/// Record the outcome of pushing one coffee.
pub fn record_sync_item(outcome: &'static str) {
    counter!(SYNC_ITEMS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_catalog_size(count: usize) {
    gauge!(CATALOG_COFFEES).set(count as f64);
}

/// Record a watcher debounce decision.
pub fn record_watcher_event(accepted: bool) {
    let decision = if accepted { "accepted" } else { "dropped" };
    counter!(WATCHER_EVENTS_TOTAL, "decision" => decision).increment(1);
}
