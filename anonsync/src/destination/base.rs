use std::fmt;
use std::future::Future;

use crate::error::SyncResult;
use crate::types::Batch;

/// Trait for systems that can atomically apply a batch of anonymized records
/// together with the matching checkpoint update.
///
/// Implementations must make `upsert_with_progress` idempotent with respect to
/// the records (upsert by primary key, replacing all fields) so that
/// at-least-once redelivery after a restart converges to the same output
/// state. The checkpoint write and the record writes must share one atomic
/// unit: on any failure neither may be observable.
pub trait Destination {
    /// Position type persisted as the checkpoint for each committed batch.
    type Position: Clone + fmt::Debug + Send + Sync + 'static;

    /// Returns the name of the destination, used in logs.
    fn name() -> &'static str;

    /// Atomically upserts every record in `batch` into the output dataset and
    /// advances the checkpoint to the batch position.
    ///
    /// An empty batch is a no-op that reports success. On failure the error is
    /// propagated and the destination must be left exactly as it was before
    /// the call.
    fn upsert_with_progress(
        &self,
        batch: Batch<Self::Position>,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Runs destination-specific cleanup when the pipeline shuts down.
    ///
    /// The default implementation is a no-op.
    fn shutdown(&self) -> impl Future<Output = SyncResult<()>> + Send {
        async { Ok(()) }
    }
}
