//! Counter store backends.
//!
//! The backend guarantees atomicity of the increment itself; clients own
//! key construction, fixed-point amount formatting, and bounded timeouts.

pub mod memory;
pub mod redis;
mod resp;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tally_shared::{BucketKey, StoreError};

/// Time-to-live applied to every bucket on every successful increment
/// (24 hours). A bucket that keeps receiving writes never expires
/// mid-day; a bucket untouched for this long is reclaimed.
pub const BUCKET_TTL: Duration = Duration::from_secs(86_400);

/// Capability interface over the remote atomic-increment/expire counter
/// backend. Implementations must be safe for concurrent callers; flushes
/// for the same bucket from multiple writers are serialized only by the
/// backend's atomic-increment guarantee.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add `amount` to `bucket`, creating it zero-initialized
    /// if absent. Returns the post-increment value.
    async fn increment(&self, bucket: &BucketKey, amount: Decimal) -> Result<Decimal, StoreError>;

    /// Reset the bucket's remaining time-to-live to exactly `ttl`.
    ///
    /// Issued only after the increment has been acknowledged: a crash
    /// between the two leaves a shorter-than-intended TTL, never a lost
    /// increment.
    async fn refresh_expiry(&self, bucket: &BucketKey, ttl: Duration) -> Result<(), StoreError>;

    /// Current counter value, or `None` when the bucket expired or was
    /// never written. Absent is the valid "zero revenue so far" state,
    /// not an error.
    async fn read(&self, bucket: &BucketKey) -> Result<Option<Decimal>, StoreError>;

    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
