//! Daily revenue buckets and their keys.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key prefix for daily revenue counters in the backing store.
pub const BUCKET_PREFIX: &str = "revenue:";

/// Canonical identifier of one daily revenue bucket.
///
/// Derivation is pure and locale-free: the same calendar date always
/// yields the identical key, across repeated calls and across process
/// restarts. Keys order by date because the date part is ISO-8601.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey(String);

impl BucketKey {
    /// Derive the bucket key for a calendar date: `revenue:YYYY-MM-DD`.
    pub fn for_date(date: NaiveDate) -> Self {
        Self(format!("{}{}", BUCKET_PREFIX, date.format("%Y-%m-%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pending, not-yet-flushed contribution to one bucket.
///
/// Deltas for the same bucket within one batch are pre-summed by the
/// accumulator before anything reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub bucket: BucketKey,
    pub amount: Decimal,
}
