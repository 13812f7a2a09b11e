//! Metrics emitted through the `metrics` facade
//!
//! The `relay-cache` binary installs no recorder, so these calls are
//! no-ops there. They are meant for processes embedding the library,
//! which install their own recorder and decide where the counters go.

use std::time::Duration;

use metrics::{counter, histogram};

/// Record the outcome of a semantic cache lookup
pub fn record_cache_lookup(outcome: &'static str) {
    counter!("semantic_cache_lookups_total", "outcome" => outcome).increment(1);
}

/// Record a blocklist check
pub fn record_sensitive_check(blocked: bool) {
    let blocked = if blocked { "true" } else { "false" };
    counter!("sensitive_checks_total", "blocked" => blocked).increment(1);
}

/// Record an embedding provider call
pub fn record_embedding_request(provider: &'static str, success: bool, duration: Duration) {
    let labels = [
        ("provider", provider.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("embedding_requests_total", &labels).increment(1);
    histogram!("embedding_request_duration_seconds", &labels).record(duration.as_secs_f64());
}
