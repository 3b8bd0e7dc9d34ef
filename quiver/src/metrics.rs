//! Prometheus-compatible metrics for search requests and config reloads

use std::time::Duration;

/// Record the outcome of one search request (`ok` or the error kind)
pub fn record_search(project: &str, document_type: &str, outcome: &str) {
    metrics::counter!(
        "quiver_search_requests_total",
        "project" => project.to_string(),
        "document_type" => document_type.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
}

/// Record engine round-trip time, including failed and timed-out calls
pub fn record_engine_latency(index: &str, duration: Duration) {
    metrics::histogram!(
        "quiver_engine_latency_seconds",
        "index" => index.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record document-type config swaps applied to the store
pub fn record_config_swaps(count: usize) {
    metrics::counter!("quiver_config_swaps_total").increment(count as u64);
}
