//! Deterministic in-memory counter store.
//!
//! Satisfies the same contract as the network client, with a manually
//! advanced clock so TTL expiry is testable without sleeping, and fault
//! injection so the driver's partial-failure path is testable.

use super::CounterStore;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tally_shared::{BucketKey, StoreError};

struct Record {
    value: Decimal,
    /// Clock point at which the record expires, if a TTL was set.
    expires_at: Option<Duration>,
}

struct Inner {
    records: HashMap<String, Record>,
    now: Duration,
    unavailable: bool,
    failing_buckets: HashSet<String>,
    failing_refreshes: HashSet<String>,
}

/// In-memory [`CounterStore`] for tests and local runs.
#[derive(Default)]
pub struct MemoryCounterStore {
    inner: Mutex<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            now: Duration::ZERO,
            unavailable: false,
            failing_buckets: HashSet::new(),
            failing_refreshes: HashSet::new(),
        }
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("store lock poisoned: {}", e)))
    }

    /// Advance the simulated clock, reclaiming records whose TTL elapsed.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.now += by;
            let now = inner.now;
            inner
                .records
                .retain(|_, r| r.expires_at.map_or(true, |at| at > now));
        }
    }

    /// Make every subsequent operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = unavailable;
        }
    }

    /// Make operations on one bucket fail, leaving other buckets healthy.
    pub fn fail_bucket(&self, bucket: &BucketKey) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_buckets.insert(bucket.as_str().to_string());
        }
    }

    /// Make only `refresh_expiry` fail for one bucket, with the increment
    /// still applied. Exercises a flush dying between the two calls.
    pub fn fail_refresh(&self, bucket: &BucketKey) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing_refreshes.insert(bucket.as_str().to_string());
        }
    }

    /// Remaining TTL for a bucket, if one was set and has not elapsed.
    pub fn ttl_remaining(&self, bucket: &BucketKey) -> Option<Duration> {
        let inner = self.inner.lock().ok()?;
        let at = inner.records.get(bucket.as_str())?.expires_at?;
        Some(at.saturating_sub(inner.now))
    }

    fn check_reachable(inner: &Inner, bucket: Option<&BucketKey>) -> Result<(), StoreError> {
        if inner.unavailable {
            return Err(StoreError::Unavailable("injected fault".to_string()));
        }
        if let Some(bucket) = bucket {
            if inner.failing_buckets.contains(bucket.as_str()) {
                return Err(StoreError::Unavailable(format!(
                    "injected fault for {}",
                    bucket
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, bucket: &BucketKey, amount: Decimal) -> Result<Decimal, StoreError> {
        let mut inner = self.lock()?;
        Self::check_reachable(&inner, Some(bucket))?;
        let record = inner
            .records
            .entry(bucket.as_str().to_string())
            .or_insert(Record {
                value: Decimal::ZERO,
                expires_at: None,
            });
        record.value += amount;
        Ok(record.value)
    }

    async fn refresh_expiry(&self, bucket: &BucketKey, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        Self::check_reachable(&inner, Some(bucket))?;
        if inner.failing_refreshes.contains(bucket.as_str()) {
            return Err(StoreError::Unavailable(format!(
                "injected refresh fault for {}",
                bucket
            )));
        }
        let expires_at = inner.now + ttl;
        if let Some(record) = inner.records.get_mut(bucket.as_str()) {
            record.expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn read(&self, bucket: &BucketKey) -> Result<Option<Decimal>, StoreError> {
        let inner = self.lock()?;
        Self::check_reachable(&inner, Some(bucket))?;
        Ok(inner.records.get(bucket.as_str()).map(|r| r.value))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let inner = self.lock()?;
        Self::check_reachable(&inner, None)
    }
}
