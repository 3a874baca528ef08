//! Aggregation driver: accumulate items, then flush per-bucket deltas.
//!
//! Buckets are independent, so flushes are dispatched concurrently in
//! bounded waves. A failing bucket is isolated in the run report; it
//! never aborts the run or the process.

use crate::accumulate::accumulate;
use crate::connection::ConnectionCache;
use crate::metrics;
use crate::store::CounterStore;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::{Duration, Instant};
use tally_shared::{BucketKey, Delta, DomainError, LineItem, StoreError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-run report: which buckets flushed and which failed.
///
/// Failed buckets carry the backend failure message and are eligible for
/// a later run. Retrying after a failure of unknown outcome can
/// double-count, since increments are additive: delivery is
/// at-least-once, not exactly-once.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Buckets flushed successfully, with their post-increment values.
    pub flushed: Vec<(BucketKey, Decimal)>,
    /// Buckets whose flush failed with a backend-unavailable condition.
    pub failed: Vec<(BucketKey, String)>,
}

impl RunReport {
    /// True when some buckets failed while the run as a whole went on.
    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct AggregationDriver<'a> {
    cache: &'a ConnectionCache,
    bucket_ttl: Duration,
    flush_concurrency: usize,
    cancel: CancellationToken,
}

impl<'a> AggregationDriver<'a> {
    pub fn new(cache: &'a ConnectionCache, bucket_ttl: Duration, flush_concurrency: usize) -> Self {
        Self {
            cache,
            bucket_ttl,
            flush_concurrency: flush_concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Token for cancelling a run in progress. Cancellation is observed
    /// between flush waves; already-flushed buckets stay applied.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Accumulate `items` into per-bucket deltas and flush each delta as
    /// an atomic increment followed by a TTL refresh.
    ///
    /// Domain-invalid items reject the run before any network call.
    /// Backend failures are collected per bucket in the report.
    pub async fn run(&self, items: &[LineItem]) -> Result<RunReport, DomainError> {
        let deltas = accumulate(items)?;
        info!(
            "aggregation run: {} items over {} buckets",
            items.len(),
            deltas.len()
        );

        let mut report = RunReport::default();
        let store = match self.cache.get().await {
            Ok(store) => store,
            Err(e) => {
                // No usable connection: every bucket fails the same way.
                warn!("counter store unreachable, no buckets flushed: {}", e);
                for (bucket, _) in deltas {
                    report.failed.push((bucket, e.to_string()));
                }
                metrics::FLUSH_TOTAL
                    .with_label_values(&["error"])
                    .inc_by(report.failed.len() as f64);
                return Ok(report);
            }
        };

        let deltas: Vec<Delta> = deltas
            .into_iter()
            .map(|(bucket, amount)| Delta { bucket, amount })
            .collect();
        let mut dispatched = 0usize;
        for wave in deltas.chunks(self.flush_concurrency) {
            if self.cancel.is_cancelled() {
                info!(
                    "run cancelled, {} of {} buckets left unflushed",
                    deltas.len() - dispatched,
                    deltas.len()
                );
                break;
            }

            let handles: Vec<_> = wave
                .iter()
                .cloned()
                .map(|delta| {
                    let store = store.clone();
                    let ttl = self.bucket_ttl;
                    let bucket = delta.bucket.clone();
                    let handle = tokio::spawn(async move {
                        let outcome = flush_bucket(&*store, &delta, ttl).await;
                        (delta.bucket, outcome)
                    });
                    (bucket, handle)
                })
                .collect();
            dispatched += wave.len();

            for (bucket, handle) in handles {
                match handle.await {
                    Ok((bucket, Ok(value))) => {
                        metrics::FLUSH_TOTAL.with_label_values(&["ok"]).inc();
                        report.flushed.push((bucket, value));
                    }
                    Ok((bucket, Err(e))) => {
                        metrics::FLUSH_TOTAL.with_label_values(&["error"]).inc();
                        warn!("flush failed for {}: {}", bucket, e);
                        report.failed.push((bucket, e.to_string()));
                    }
                    // A panicked task still owes the report an outcome,
                    // otherwise the bucket can never be retried.
                    Err(e) => {
                        metrics::FLUSH_TOTAL.with_label_values(&["error"]).inc();
                        warn!("flush task for {} panicked: {}", bucket, e);
                        report.failed.push((bucket, format!("flush task panicked: {}", e)));
                    }
                }
            }
        }

        info!(
            "aggregation run finished: {} flushed, {} failed",
            report.flushed.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// Increment first, then refresh the TTL. A crash between the two leaves
/// the bucket with a shorter-than-intended TTL rather than a lost
/// increment.
async fn flush_bucket(
    store: &dyn CounterStore,
    delta: &Delta,
    ttl: Duration,
) -> Result<Decimal, StoreError> {
    let start = Instant::now();
    let value = store.increment(&delta.bucket, delta.amount).await?;
    store.refresh_expiry(&delta.bucket, ttl).await?;
    metrics::FLUSH_DURATION.observe(start.elapsed().as_secs_f64());
    debug!("flushed {} += {} -> {}", delta.bucket, delta.amount, value);
    Ok(value)
}
