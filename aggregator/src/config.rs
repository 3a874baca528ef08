//! Aggregator configuration

use crate::store::BUCKET_TTL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Counter store backend address (host:port)
    pub store_addr: String,

    /// TTL applied to every bucket on every successful flush, in seconds
    pub bucket_ttl_secs: u64,

    /// Max buckets flushed concurrently per wave
    pub flush_concurrency: usize,

    /// Bound on every counter store operation, in milliseconds
    pub op_timeout_ms: u64,
}

impl AggregatorConfig {
    pub fn bucket_ttl(&self) -> Duration {
        Duration::from_secs(self.bucket_ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            store_addr: std::env::var("TALLY_STORE_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:6379".to_string()),
            bucket_ttl_secs: env_parse("TALLY_BUCKET_TTL_SECS", BUCKET_TTL.as_secs()),
            flush_concurrency: env_parse("TALLY_FLUSH_CONCURRENCY", 8),
            op_timeout_ms: env_parse("TALLY_OP_TIMEOUT_MS", 5_000),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
