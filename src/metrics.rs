//! Prometheus Metrics
//!
//! Metrics include:
//! - adapter invocations per source and outcome
//! - adapter latency per source (histogram)
//! - cache hits, misses and coalesced waits
//! - request outcomes at the service boundary
//! - upstream HTTP status codes

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramOpts, HistogramVec,
    IntCounterVec, TextEncoder,
};
use tracing::error;

// ============================================
// METRIC DEFINITIONS
// ============================================

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";

pub const CACHE_HIT: &str = "hit";
pub const CACHE_MISS: &str = "miss";
pub const CACHE_COALESCED: &str = "coalesced";

// Adapter invocations
static FETCH_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_fetch_total",
        "Adapter invocations by source and outcome",
        &["source", "outcome"]
    )
    .expect("Failed to create fetch_total metric")
});

// Adapter latency (in seconds)
static FETCH_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];
    register_histogram_vec!(
        HistogramOpts::new(
            "trending_fetch_latency_seconds",
            "Latency of adapter invocations in seconds"
        )
        .buckets(buckets),
        &["source"]
    )
    .expect("Failed to create fetch_latency metric")
});

// Cache lookups
static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_cache_lookups_total",
        "Response cache lookups by result",
        &["result"]
    )
    .expect("Failed to create cache_lookups metric")
});

// Requests at the service boundary
static REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_requests_total",
        "Handled requests by outcome",
        &["outcome"]
    )
    .expect("Failed to create requests metric")
});

// Upstream responses
static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_upstream_requests_total",
        "Upstream HTTP requests by status",
        &["status"]
    )
    .expect("Failed to create upstream_requests metric")
});

// ============================================
// METRICS API
// ============================================

/// Records one adapter invocation
pub fn record_fetch(source: &str, success: bool, latency_secs: f64) {
    let outcome = if success { OUTCOME_SUCCESS } else { OUTCOME_FAILURE };
    FETCH_TOTAL.with_label_values(&[source, outcome]).inc();
    FETCH_LATENCY.with_label_values(&[source]).observe(latency_secs);
}

/// Records a cache lookup result
pub fn record_cache_lookup(result: &str) {
    CACHE_LOOKUPS.with_label_values(&[result]).inc();
}

/// Records a request outcome (`success` or a failure kind)
pub fn record_request(outcome: &str) {
    REQUESTS.with_label_values(&[outcome]).inc();
}

/// Records an upstream response status (or `error` for transport failures)
pub fn record_upstream_request(status: &str) {
    UPSTREAM_REQUESTS.with_label_values(&[status]).inc();
}

// ============================================
// METRICS COLLECTION
// ============================================

/// Collects all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_metrics() {
        record_fetch("weibo", true, 0.2);
        record_fetch("weibo", false, 1.5);
        record_cache_lookup(CACHE_HIT);
        record_request("adapter_error");
        record_upstream_request("200");

        let metrics = gather_metrics();
        assert!(metrics.contains("trending_fetch_total"));
        assert!(metrics.contains("trending_fetch_latency_seconds"));
        assert!(metrics.contains("trending_cache_lookups_total"));
        assert!(metrics.contains("trending_requests_total"));
        assert!(metrics.contains("trending_upstream_requests_total"));
    }
}
