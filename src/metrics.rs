//! Prometheus counters for the monitor
//!
//! Registered once in the default registry and exposed by the `/metrics`
//! endpoint.

use prometheus::{register_int_counter_vec, IntCounterVec};
use std::sync::LazyLock;

pub static SOFT_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_soft_errors_total",
        "Malformed depth entries skipped",
        &["symbol", "side"]
    )
    .expect("soft error counter registers once")
});

pub static EMPTY_DELTAS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_empty_deltas_total",
        "Depth messages without any bid or ask entry",
        &["symbol"]
    )
    .expect("empty delta counter registers once")
});

pub static FORWARDED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_forwarded_total",
        "Top-of-book views forwarded for imbalance computation",
        &["symbol"]
    )
    .expect("forwarded counter registers once")
});

pub static ALERTS_DELIVERED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_alerts_delivered_total",
        "Alerts successfully delivered by the notifier",
        &["symbol"]
    )
    .expect("delivered counter registers once")
});

pub static ALERTS_FAILED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_alerts_failed_total",
        "Alerts the notifier failed to deliver",
        &["symbol"]
    )
    .expect("failed counter registers once")
});

pub static RECONNECTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imbalance_reconnects_total",
        "Feed reconnection attempts",
        &["symbol"]
    )
    .expect("reconnect counter registers once")
});

/// Render every registered metric in the text exposition format
pub fn render() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
