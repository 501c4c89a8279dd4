use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::destination::base::Destination;
use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;
use crate::types::{Batch, Customer, CustomerId};

#[derive(Debug)]
struct Inner<P> {
    output: BTreeMap<CustomerId, Customer>,
    checkpoint: Option<P>,
    commits: usize,
    fail_next_commits: usize,
}

/// In-memory destination for testing and development purposes.
///
/// The output map and the checkpoint live behind one lock, so each batch is
/// applied atomically the way the production transaction is. Commit failures
/// can be injected to exercise the abort path: an injected failure leaves both
/// the output and the checkpoint untouched.
#[derive(Debug, Clone)]
pub struct MemoryDestination<P> {
    inner: Arc<Mutex<Inner<P>>>,
}

impl<P> MemoryDestination<P> {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        let inner = Inner {
            output: BTreeMap::new(),
            checkpoint: None,
            commits: 0,
            fail_next_commits: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns a copy of the output dataset in ascending key order.
    pub async fn output(&self) -> Vec<Customer> {
        let inner = self.inner.lock().await;
        inner.output.values().cloned().collect()
    }

    /// Returns the output record with the given key, if any.
    pub async fn record(&self, id: &CustomerId) -> Option<Customer> {
        let inner = self.inner.lock().await;
        inner.output.get(id).cloned()
    }

    /// Returns the number of successfully committed batches.
    pub async fn commits(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.commits
    }

    /// Makes the next commit fail without applying anything.
    pub async fn fail_next_commit(&self) {
        let mut inner = self.inner.lock().await;
        inner.fail_next_commits += 1;
    }
}

impl<P: Clone> MemoryDestination<P> {
    /// Returns the committed checkpoint position, if any.
    pub async fn checkpoint(&self) -> Option<P> {
        let inner = self.inner.lock().await;
        inner.checkpoint.clone()
    }

    /// Seeds the checkpoint, as if a previous run had committed up to
    /// `position`.
    pub async fn set_checkpoint(&self, position: P) {
        let mut inner = self.inner.lock().await;
        inner.checkpoint = Some(position);
    }
}

impl<P> Default for MemoryDestination<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Destination for MemoryDestination<P>
where
    P: Clone + fmt::Debug + Send + Sync + 'static,
{
    type Position = P;

    fn name() -> &'static str {
        "memory"
    }

    async fn upsert_with_progress(&self, batch: Batch<P>) -> SyncResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;

        if inner.fail_next_commits > 0 {
            inner.fail_next_commits -= 1;

            return Err(sync_error!(
                ErrorKind::TransactionFailed,
                "Injected commit failure",
                format!("batch of {} records was not applied", batch.len())
            ));
        }

        info!(records = batch.len(), "applying batch to memory destination");

        for record in batch.records {
            inner.output.insert(record.id, record);
        }
        inner.checkpoint = Some(batch.position);
        inner.commits += 1;

        Ok(())
    }
}
