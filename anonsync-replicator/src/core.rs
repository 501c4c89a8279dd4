use anonsync::destination::base::Destination;
use anonsync::destination::mongodb::{MongoDestination, ReindexProgress, SyncProgress};
use anonsync::error::SyncError;
use anonsync::pipeline::Pipeline;
use anonsync::source::base::SourceStream;
use anonsync::source::change::MongoChangeSource;
use anonsync::source::reindex::MongoReindexSource;
use anonsync_config::shared::{BatchConfig, PipelineConfig, ReplicatorConfig};
use mongodb::Client;
use secrecy::ExposeSecret;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use crate::cli::ReplicationMode;
use crate::error::ReplicatorResult;

/// Starts the replicator service with the provided configuration and mode.
///
/// Connects to MongoDB, builds the source and destination for the selected
/// mode, and runs the pipeline until completion or shutdown.
pub async fn start_replicator_with_config(
    replicator_config: ReplicatorConfig,
    mode: ReplicationMode,
) -> ReplicatorResult<()> {
    info!(mode = ?mode, "starting replicator service");

    log_pipeline_config(&replicator_config.pipeline);

    let pipeline_config = replicator_config.pipeline;
    let client = Client::with_uri_str(pipeline_config.connection.uri.expose_secret())
        .await
        .map_err(SyncError::from)?;
    let database = client.database(&pipeline_config.connection.database);

    match mode {
        ReplicationMode::Reindex => {
            let source = MongoReindexSource::new(&database, &pipeline_config.collections);
            let destination = MongoDestination::<ReindexProgress>::new(
                client.clone(),
                &database,
                &pipeline_config.collections,
            );

            let pipeline = Pipeline::new(pipeline_config, source, destination);
            start_pipeline(pipeline).await?;
        }
        ReplicationMode::Sync => {
            let source = MongoChangeSource::new(&database, &pipeline_config.collections);
            let destination = MongoDestination::<SyncProgress>::new(
                client.clone(),
                &database,
                &pipeline_config.collections,
            );

            let pipeline = Pipeline::new(pipeline_config, source, destination);
            start_pipeline(pipeline).await?;
        }
    }

    info!("replicator service completed");

    Ok(())
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(
        database = config.connection.database,
        source = config.collections.source,
        output = config.collections.output,
        hash_length = config.anonymizer.hash_length,
        "pipeline config"
    );
    log_batch_config(&config.batch);
}

fn log_batch_config(config: &BatchConfig) {
    debug!(
        max_size = config.max_size,
        max_fill_ms = config.max_fill_ms,
        "batch config"
    );
}

/// Starts a pipeline and handles graceful shutdown signals.
///
/// Launches the pipeline, sets up signal handlers for SIGTERM and SIGINT,
/// and ensures proper cleanup on shutdown. The pipeline flushes the pending
/// batch and lets the in-flight transaction settle before terminating.
async fn start_pipeline<S, D>(mut pipeline: Pipeline<S, D>) -> ReplicatorResult<()>
where
    S: SourceStream + Send + 'static,
    D: Destination<Position = S::Position> + Send + Sync + 'static,
{
    pipeline.start().await?;

    // Translate external termination signals into one shutdown request.
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, shutting down pipeline");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, shutting down pipeline");
            }
        }

        if let Err(err) = shutdown_tx.shutdown() {
            warn!(error = ?err, "failed to send shutdown signal");
        }
    });

    // Wait for the pipeline to finish, either normally or via shutdown.
    let result = pipeline.wait().await;

    // The signal task is no longer needed once the pipeline settled.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result?;

    Ok(())
}
