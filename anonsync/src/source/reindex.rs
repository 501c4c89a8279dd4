use anonsync_config::shared::CollectionsConfig;
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use tracing::{debug, info};

use crate::error::SyncResult;
use crate::source::base::{SourceItem, SourceItems, SourceStream};
use crate::types::{Customer, CustomerId, REINDEX_CHECKPOINT_ID, ReindexCheckpoint};

/// Finite, ordered scan over the source collection for full reindex runs.
///
/// The scan resumes after the checkpointed primary key when a checkpoint
/// exists, otherwise it covers the whole collection. Records are yielded in
/// ascending key order so the checkpoint only ever moves forward.
#[derive(Debug, Clone)]
pub struct MongoReindexSource {
    source: Collection<Customer>,
    checkpoints: Collection<ReindexCheckpoint>,
}

impl MongoReindexSource {
    /// Creates a reindex source over the configured collections of `database`.
    pub fn new(database: &Database, collections: &CollectionsConfig) -> Self {
        Self {
            source: database.collection(&collections.source),
            checkpoints: database.collection(&collections.reindex_progress),
        }
    }
}

impl SourceStream for MongoReindexSource {
    type Position = CustomerId;

    const TERMINATES: bool = true;

    fn name() -> &'static str {
        "reindex"
    }

    async fn create_or_resume(&mut self) -> SyncResult<SourceItems<CustomerId>> {
        let checkpoint = self
            .checkpoints
            .find_one(doc! { "_id": REINDEX_CHECKPOINT_ID })
            .await?;

        let filter = match &checkpoint {
            Some(checkpoint) => {
                info!(
                    last_processed_id = %checkpoint.last_processed_id,
                    "resuming reindex scan after checkpoint"
                );

                doc! { "_id": { "$gt": checkpoint.last_processed_id } }
            }
            None => {
                info!("no reindex checkpoint found, scanning from the beginning");

                doc! {}
            }
        };

        let cursor = self.source.find(filter).sort(doc! { "_id": 1 }).await?;

        // Each record's own key is its checkpoint position.
        let items = cursor.map(|record| match record {
            Ok(record) => Ok(SourceItem {
                position: record.id,
                record,
            }),
            Err(err) => Err(err.into()),
        });

        Ok(items.boxed())
    }

    async fn close(&mut self) -> SyncResult<()> {
        // The cursor is owned by the stream and released when it drops.
        debug!("reindex source closed");

        Ok(())
    }
}
