use std::sync::Arc;

use anonsync_config::shared::PipelineConfig;
use futures::StreamExt;
use tokio::pin;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::anonymizer::anonymize_customer;
use crate::bail;
use crate::concurrency::shutdown::{
    ShutdownResult, ShutdownRx, ShutdownTx, create_shutdown_channel,
};
use crate::concurrency::stream::BatchStream;
use crate::destination::base::Destination;
use crate::error::{ErrorKind, SyncResult};
use crate::source::base::{SourceItem, SourceStream};
use crate::sync_error;
use crate::types::Batch;

/// Wires a source, the anonymizer, the batch coalescer, and a destination
/// into one replication run.
///
/// The pipeline owns the shutdown channel: external termination signals are
/// translated into a single [`Pipeline::shutdown`] call, the pending batch is
/// flushed, and the source is closed on every exit path. In-flight
/// transactional writes always settle before shutdown proceeds.
#[derive(Debug)]
pub struct Pipeline<S, D> {
    config: Arc<PipelineConfig>,
    components: Option<(S, D)>,
    worker: Option<JoinHandle<SyncResult<()>>>,
    shutdown_tx: ShutdownTx,
}

impl<S, D> Pipeline<S, D>
where
    S: SourceStream + Send + 'static,
    D: Destination<Position = S::Position> + Send + Sync + 'static,
{
    /// Creates a pipeline over `source` and `destination`.
    pub fn new(config: PipelineConfig, source: S, destination: D) -> Self {
        // The receiver half is recreated on demand via `subscribe`.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config: Arc::new(config),
            components: Some((source, destination)),
            worker: None,
            shutdown_tx,
        }
    }

    /// Returns a handle that can signal shutdown to this pipeline.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Spawns the replication worker.
    pub async fn start(&mut self) -> SyncResult<()> {
        let Some((source, destination)) = self.components.take() else {
            bail!(ErrorKind::InvalidState, "Pipeline was already started");
        };

        info!(
            source = S::name(),
            destination = D::name(),
            "starting replication pipeline"
        );

        let config = self.config.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let worker = tokio::spawn(run_pipeline(config, source, destination, shutdown_rx));
        self.worker = Some(worker);

        Ok(())
    }

    /// Waits for the replication worker to complete.
    pub async fn wait(self) -> SyncResult<()> {
        let Some(worker) = self.worker else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for the replication worker to complete");

        match worker.await {
            Ok(result) => result,
            Err(err) => Err(sync_error!(
                ErrorKind::PipelineWorkerPanic,
                "Replication worker terminated abnormally",
                err
            )),
        }
    }

    /// Signals the replication worker to shut down at the next batch boundary.
    pub fn shutdown(&self) {
        info!("trying to shut down the pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            error!(error = %err, "failed to send shutdown signal to the pipeline");
            return;
        }

        info!("shutdown signal successfully sent to the replication worker");
    }

    /// Signals shutdown and waits for the worker to finish.
    pub async fn shutdown_and_wait(self) -> SyncResult<()> {
        self.shutdown();
        self.wait().await
    }
}

/// Runs one replication pass and guarantees teardown on every exit path.
async fn run_pipeline<S, D>(
    config: Arc<PipelineConfig>,
    mut source: S,
    destination: D,
    shutdown_rx: ShutdownRx,
) -> SyncResult<()>
where
    S: SourceStream,
    D: Destination<Position = S::Position>,
{
    let mut last_committed: Option<S::Position> = None;

    let result = run_replication_loop(
        &config,
        &mut source,
        &destination,
        shutdown_rx,
        &mut last_committed,
    )
    .await;

    if let Err(err) = &result {
        error!(
            source = S::name(),
            last_committed = ?last_committed,
            error = %err,
            "replication terminated with an error"
        );
    }

    // Teardown runs regardless of how the loop ended; the in-flight write (if
    // any) has already settled because the loop awaits each commit inline.
    if let Err(err) = source.close().await {
        warn!(error = %err, "failed to close the source cleanly");
    }
    if let Err(err) = destination.shutdown().await {
        warn!(error = %err, "destination shutdown hook failed");
    }

    result
}

/// Drives records from the source through the anonymizer and coalescer into
/// the destination until exhaustion, failure, or shutdown.
async fn run_replication_loop<S, D>(
    config: &PipelineConfig,
    source: &mut S,
    destination: &D,
    shutdown_rx: ShutdownRx,
    last_committed: &mut Option<S::Position>,
) -> SyncResult<()>
where
    S: SourceStream,
    D: Destination<Position = S::Position>,
{
    let mut loop_shutdown_rx = shutdown_rx.clone();

    let items = source.create_or_resume().await?;

    let hash_length = config.anonymizer.hash_length;
    let records = items.map(move |item| {
        item.and_then(|item| {
            Ok(SourceItem {
                record: anonymize_customer(&item.record, hash_length)?,
                position: item.position,
            })
        })
    });

    let batches = BatchStream::wrap(records, config.batch.clone(), shutdown_rx);
    pin!(batches);

    loop {
        // The batch stream observes the shutdown signal when polled; the
        // select arm only exists to wake this task up so the stream gets
        // polled again and can hand back its pending remainder.
        let maybe_batch = tokio::select! {
            maybe_batch = batches.next() => maybe_batch,
            changed = loop_shutdown_rx.changed() => {
                if changed.is_ok() {
                    continue;
                }

                // Every sender is gone, so no shutdown signal can arrive
                // anymore; keep draining the stream directly.
                batches.next().await
            }
        };

        let Some(batch) = maybe_batch else {
            break;
        };

        match batch {
            ShutdownResult::Ok(items) => {
                commit_batch(destination, items, last_committed).await?;
            }
            ShutdownResult::Shutdown(items) => {
                info!(
                    source = S::name(),
                    pending = items.len(),
                    "shutdown requested, flushing pending records"
                );
                commit_batch(destination, items, last_committed).await?;

                return Ok(());
            }
        }
    }

    if S::TERMINATES {
        info!(source = S::name(), "source exhausted, replication complete");

        Ok(())
    } else {
        bail!(
            ErrorKind::ChangeFeedEnded,
            "Change feed terminated unexpectedly",
            format!("last committed position: {last_committed:?}")
        );
    }
}

/// Commits one coalesced batch and records its position.
///
/// A batch containing a failed item is never partially committed: the error
/// is surfaced and the uncommitted tail is reprocessed from the last
/// committed checkpoint after a restart.
async fn commit_batch<D>(
    destination: &D,
    items: Vec<SyncResult<SourceItem<D::Position>>>,
    last_committed: &mut Option<D::Position>,
) -> SyncResult<()>
where
    D: Destination,
{
    let items = items.into_iter().collect::<SyncResult<Vec<_>>>()?;

    let Some(batch) = Batch::from_items(items) else {
        return Ok(());
    };

    let records = batch.len();
    let position = batch.position.clone();
    destination.upsert_with_progress(batch).await?;
    *last_committed = Some(position);

    debug!(
        records,
        position = ?last_committed,
        "batch committed and checkpoint advanced"
    );

    Ok(())
}
