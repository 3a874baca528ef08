//! Driver flush behavior against the deterministic in-memory store.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tally_aggregator::connection::ConnectionCache;
use tally_aggregator::dashboard::RevenueDashboard;
use tally_aggregator::driver::AggregationDriver;
use tally_aggregator::store::{CounterStore, MemoryCounterStore, BUCKET_TTL};
use tally_shared::{BucketKey, LineItem, StoreError};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn sample_items() -> Vec<LineItem> {
    vec![
        LineItem::new(date(1), dec!(100.0), 2),
        LineItem::new(date(1), dec!(50.0), 3),
        LineItem::new(date(2), dec!(200.0), 1),
    ]
}

#[tokio::test]
async fn run_flushes_summed_deltas_per_bucket() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let report = driver.run(&sample_items()).await.unwrap();
    assert_eq!(report.flushed.len(), 2);
    assert!(report.failed.is_empty());
    assert!(!report.is_partial_failure());

    assert_eq!(
        store.read(&BucketKey::for_date(date(1))).await.unwrap(),
        Some(dec!(350.0))
    );
    assert_eq!(
        store.read(&BucketKey::for_date(date(2))).await.unwrap(),
        Some(dec!(200.0))
    );
}

#[tokio::test]
async fn repeated_runs_accumulate() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    driver.run(&sample_items()).await.unwrap();
    driver.run(&sample_items()).await.unwrap();

    assert_eq!(
        store.read(&BucketKey::for_date(date(1))).await.unwrap(),
        Some(dec!(700.0))
    );
}

#[tokio::test]
async fn every_flush_refreshes_ttl() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    driver.run(&sample_items()).await.unwrap();
    let bucket = BucketKey::for_date(date(1));
    assert_eq!(store.ttl_remaining(&bucket), Some(BUCKET_TTL));

    // Half a day passes, then another run lands on the same bucket.
    store.advance(Duration::from_secs(43_200));
    driver.run(&sample_items()).await.unwrap();
    assert_eq!(store.ttl_remaining(&bucket), Some(BUCKET_TTL));

    // Untouched past the TTL, the bucket is reclaimed.
    store.advance(BUCKET_TTL);
    assert_eq!(store.read(&bucket).await.unwrap(), None);
}

#[tokio::test]
async fn one_failing_bucket_does_not_abort_the_run() {
    let store = Arc::new(MemoryCounterStore::new());
    let failing = BucketKey::for_date(date(2));
    store.fail_bucket(&failing);

    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let report = driver.run(&sample_items()).await.unwrap();
    assert!(report.is_partial_failure());
    assert_eq!(report.flushed.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, failing);

    // The healthy bucket was still flushed.
    assert_eq!(
        store.read(&BucketKey::for_date(date(1))).await.unwrap(),
        Some(dec!(350.0))
    );
}

#[tokio::test]
async fn unreachable_backend_fails_all_buckets_without_crashing() {
    let store = Arc::new(MemoryCounterStore::new());
    store.set_unavailable(true);

    let cache = ConnectionCache::new(store);
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let report = driver.run(&sample_items()).await.unwrap();
    assert!(report.flushed.is_empty());
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test]
async fn invalid_items_reject_the_run_before_any_flush() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let mut items = sample_items();
    items.push(LineItem::new(date(1), dec!(10.0), -1));
    assert!(driver.run(&items).await.is_err());

    // Nothing reached the store.
    assert_eq!(store.read(&BucketKey::for_date(date(1))).await.unwrap(), None);
}

/// Store whose increment dies mid-flight instead of returning an error.
struct ExplodingStore;

#[async_trait]
impl CounterStore for ExplodingStore {
    async fn increment(&self, _: &BucketKey, _: Decimal) -> Result<Decimal, StoreError> {
        panic!("increment blew up mid-flight");
    }

    async fn refresh_expiry(&self, _: &BucketKey, _: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read(&self, _: &BucketKey) -> Result<Option<Decimal>, StoreError> {
        Ok(None)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn panicked_flush_task_is_reported_as_failed() {
    let cache = ConnectionCache::new(Arc::new(ExplodingStore));
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let items = vec![LineItem::new(date(1), dec!(10.0), 1)];
    let report = driver.run(&items).await.unwrap();

    // The bucket's outcome must not vanish from the report.
    assert!(report.flushed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, BucketKey::for_date(date(1)));
    assert!(report.failed[0].1.contains("panicked"));
}

#[tokio::test]
async fn failed_ttl_refresh_keeps_the_increment() {
    let store = Arc::new(MemoryCounterStore::new());
    let bucket = BucketKey::for_date(date(1));
    store.fail_refresh(&bucket);

    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let report = driver.run(&sample_items()).await.unwrap();
    assert!(report.is_partial_failure());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bucket);

    // The increment landed before the refresh failed: the value survives
    // with no TTL, never the other way around.
    assert_eq!(store.read(&bucket).await.unwrap(), Some(dec!(350.0)));
    assert_eq!(store.ttl_remaining(&bucket), None);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_wave() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store.clone());
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    driver.cancellation_token().cancel();
    let report = driver.run(&sample_items()).await.unwrap();
    assert!(report.flushed.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(store.read(&BucketKey::for_date(date(1))).await.unwrap(), None);
}

#[tokio::test]
async fn dashboard_sees_driver_writes_through_shared_cache() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store);
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);
    let dashboard = RevenueDashboard::new(&cache);

    assert_eq!(dashboard.current_revenue(date(1)).await.unwrap(), None);
    driver.run(&sample_items()).await.unwrap();
    assert_eq!(
        dashboard.current_revenue(date(1)).await.unwrap(),
        Some(dec!(350.0))
    );
}

#[tokio::test]
async fn empty_input_is_an_empty_report() {
    let store = Arc::new(MemoryCounterStore::new());
    let cache = ConnectionCache::new(store);
    let driver = AggregationDriver::new(&cache, BUCKET_TTL, 4);

    let report = driver.run(&[]).await.unwrap();
    assert!(report.flushed.is_empty());
    assert!(report.failed.is_empty());
}
