//! Aggregation service library
//!
//! Pulls line items from an [`source::ItemSource`], reduces them into
//! per-day revenue deltas, and flushes each delta as an atomic increment
//! with a bounded TTL through a [`store::CounterStore`] backend.

pub mod accumulate;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod driver;
pub mod metrics;
pub mod source;
pub mod store;
