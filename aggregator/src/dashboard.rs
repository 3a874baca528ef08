//! Dashboard read path over daily revenue buckets.

use crate::connection::ConnectionCache;
use crate::metrics;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::{BucketKey, StoreError};

/// Read-only view over the counter store, shared with the write path
/// through the same [`ConnectionCache`].
pub struct RevenueDashboard<'a> {
    cache: &'a ConnectionCache,
}

impl<'a> RevenueDashboard<'a> {
    pub fn new(cache: &'a ConnectionCache) -> Self {
        Self { cache }
    }

    /// Revenue recorded so far for `date`, or `None` when the bucket has
    /// expired or was never written. Both cases are indistinguishable at
    /// the backend and both mean "treat as zero", never an error.
    pub async fn current_revenue(&self, date: NaiveDate) -> Result<Option<Decimal>, StoreError> {
        let value = match self.read_bucket(date).await {
            Ok(value) => value,
            Err(e) => {
                metrics::DASHBOARD_READS.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };
        let result = if value.is_some() { "hit" } else { "absent" };
        metrics::DASHBOARD_READS.with_label_values(&[result]).inc();
        Ok(value)
    }

    async fn read_bucket(&self, date: NaiveDate) -> Result<Option<Decimal>, StoreError> {
        let store = self.cache.get().await?;
        store.read(&BucketKey::for_date(date)).await
    }
}
