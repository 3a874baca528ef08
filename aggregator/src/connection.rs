//! Process-wide cached handle to the counter store backend.
//!
//! Constructed once at the composition root and passed by reference to
//! the write path (driver) and the read path (dashboard). The handle is
//! liveness-checked lazily on the first access; its identity never
//! changes afterwards, callers only use it to issue operations.

use crate::store::CounterStore;
use std::sync::Arc;
use tally_shared::StoreError;
use tokio::sync::OnceCell;

pub struct ConnectionCache {
    store: Arc<dyn CounterStore>,
    ready: OnceCell<()>,
}

impl ConnectionCache {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            ready: OnceCell::new(),
        }
    }

    /// Shared store handle.
    ///
    /// The first successful access pings the backend; a failed probe
    /// leaves the cell empty so the next access probes again.
    pub async fn get(&self) -> Result<Arc<dyn CounterStore>, StoreError> {
        self.ready
            .get_or_try_init(|| async { self.store.ping().await })
            .await?;
        Ok(self.store.clone())
    }
}
