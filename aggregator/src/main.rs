//! Aggregation service entry point.
//!
//! Composition root: config from env, one shared connection cache, a
//! driver pass over the item source, and a dashboard read of the result.
//! Scheduling (how often a pass runs) is an external concern; this binary
//! performs a single pass.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tally_aggregator::config::AggregatorConfig;
use tally_aggregator::connection::ConnectionCache;
use tally_aggregator::dashboard::RevenueDashboard;
use tally_aggregator::driver::AggregationDriver;
use tally_aggregator::source::{FetchCriteria, ItemSource, VecSource};
use tally_aggregator::store::RedisCounterStore;
use tally_shared::LineItem;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = AggregatorConfig::default();
    info!(
        "starting tally aggregator: store={} ttl={}s concurrency={}",
        config.store_addr, config.bucket_ttl_secs, config.flush_concurrency
    );

    let store = Arc::new(RedisCounterStore::new(
        config.store_addr.clone(),
        config.op_timeout(),
    ));
    let cache = ConnectionCache::new(store);

    let today = Utc::now().date_naive();
    let source = VecSource::new(demo_items(today));
    let items = source
        .fetch(&FetchCriteria {
            from: today,
            to: today,
        })
        .await
        .context("fetch items")?;

    let driver = AggregationDriver::new(&cache, config.bucket_ttl(), config.flush_concurrency);
    let report = driver.run(&items).await.context("aggregation run")?;
    info!(
        "run report: {}",
        serde_json::to_string(&report).context("serialize run report")?
    );
    if report.is_partial_failure() {
        warn!("{} buckets were not flushed this run", report.failed.len());
    }

    let dashboard = RevenueDashboard::new(&cache);
    match dashboard.current_revenue(today).await {
        Ok(revenue) => info!(
            "revenue for {}: {}",
            today,
            revenue.unwrap_or(Decimal::ZERO)
        ),
        Err(e) => warn!("dashboard read failed: {}", e),
    }

    Ok(())
}

/// Stand-in for the relational order store until one is wired up.
fn demo_items(date: NaiveDate) -> Vec<LineItem> {
    vec![
        LineItem::new(date, Decimal::new(10050, 2), 2), // 100.50 x 2
        LineItem::new(date, Decimal::new(4999, 2), 1),  // 49.99 x 1
        LineItem::new(date, Decimal::new(999, 2), 10),  // 9.99 x 10
    ]
}
