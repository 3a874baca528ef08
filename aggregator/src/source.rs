//! Pull source of transactional line items.

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_shared::LineItem;

/// Date-range criteria for fetching items. Opaque to the aggregation
/// core; the source decides what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCriteria {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Read source of line items, e.g. the relational order store.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch(&self, criteria: &FetchCriteria) -> anyhow::Result<Vec<LineItem>>;
}

/// In-memory source for tests and local runs.
pub struct VecSource {
    items: Vec<LineItem>,
}

impl VecSource {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ItemSource for VecSource {
    async fn fetch(&self, criteria: &FetchCriteria) -> anyhow::Result<Vec<LineItem>> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.order_date >= criteria.from && i.order_date <= criteria.to)
            .cloned()
            .collect())
    }
}
