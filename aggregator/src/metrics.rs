//! Prometheus metrics for the aggregation driver and the read path.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

// ── Flush metrics ────────────────────────────────────────────────────────────

pub static FLUSH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("tally_flush_total", "Bucket flush attempts", &["status"]).unwrap()
});

pub static FLUSH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tally_flush_duration_seconds",
        "Per-bucket flush latency (increment + expiry refresh)",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap()
});

// ── Dashboard metrics ────────────────────────────────────────────────────────

pub static DASHBOARD_READS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tally_dashboard_reads_total",
        "Dashboard bucket reads",
        &["result"]
    )
    .unwrap()
});

/// Render all registered metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
