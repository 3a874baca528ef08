//! Shared domain types for the Tally revenue aggregator
//!
//! This crate contains the data model and error taxonomy used across
//! the aggregation driver, counter store clients, and the dashboard
//! read path.

pub mod error;
pub mod revenue;
pub mod types;

// Re-export commonly used types
pub use error::{DomainError, StoreError};
pub use types::bucket::{BucketKey, Delta};
pub use types::item::LineItem;
