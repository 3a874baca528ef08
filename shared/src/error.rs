//! Error taxonomy for the aggregation core.
//!
//! `DomainError` rejects invalid items before anything is flushed.
//! `StoreError` covers counter store failures; a single failing bucket
//! is isolated and reported, never fatal to a run.

use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Invalid item data, rejected before any flush reaches the backend.
///
/// A negative bucket total is not a valid business state, so negative
/// revenue is rejected rather than silently aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("negative unit price: {price}")]
    NegativePrice { price: Decimal },

    #[error("negative quantity: {quantity}")]
    NegativeQuantity { quantity: i64 },

    #[error("contribution overflows: {price} * {quantity}")]
    ContributionOverflow { price: Decimal, quantity: i64 },
}

/// Counter store operation failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backend unreachable or connection lost. The affected bucket is
    /// recorded in the run report and may be retried on a later run.
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded its bounded timeout. Treated as unavailable;
    /// the outcome of the in-flight operation is unknown.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// The backend replied with something the client cannot interpret.
    #[error("counter store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Whether the failure means the backend could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout { .. })
    }
}
