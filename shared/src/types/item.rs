//! Transactional line items as pulled from an item source.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One order line item: the unit of ingestion.
///
/// Owned by the item source (the relational order store); read-only to
/// the aggregation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Calendar date of the order this item belongs to.
    pub order_date: NaiveDate,

    /// Price per unit. Negative prices are rejected at calculation time.
    pub unit_price: Decimal,

    /// Units sold. Signed so that invalid negative input is representable
    /// and rejected as a domain error instead of wrapping silently.
    pub quantity: i64,
}

impl LineItem {
    pub fn new(order_date: NaiveDate, unit_price: Decimal, quantity: i64) -> Self {
        Self {
            order_date,
            unit_price,
            quantity,
        }
    }
}
