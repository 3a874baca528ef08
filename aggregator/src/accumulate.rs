//! In-process reduction of line items into per-bucket deltas.
//!
//! Summation happens before any network call, so each bucket is flushed
//! with exactly one increment per run: fewer round trips and a single
//! TTL reset per bucket.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tally_shared::revenue::contribution;
use tally_shared::{BucketKey, DomainError, LineItem};

/// Reduce items into summed per-bucket amounts.
///
/// Order-independent: summation is commutative and associative, so any
/// permutation of the same items yields the same map. Empty input yields
/// an empty map. A domain-invalid item rejects the whole batch before
/// anything is flushed.
///
/// The `BTreeMap` gives a stable flush order, which keeps logs and
/// reports deterministic across runs.
pub fn accumulate(items: &[LineItem]) -> Result<BTreeMap<BucketKey, Decimal>, DomainError> {
    let mut deltas = BTreeMap::new();
    for item in items {
        let amount = contribution(item)?;
        let bucket = BucketKey::for_date(item.order_date);
        *deltas.entry(bucket).or_insert(Decimal::ZERO) += amount;
    }
    Ok(deltas)
}
