use anonsync_config::shared::CollectionsConfig;
use futures::StreamExt;
use mongodb::bson::doc;
use mongodb::change_stream::event::OperationType;
use mongodb::options::FullDocumentType;
use mongodb::{Collection, Database};
use tracing::{debug, info};

use crate::error::{ErrorKind, SyncResult};
use crate::source::base::{SourceItem, SourceItems, SourceStream};
use crate::sync_error;
use crate::types::{ChangeCheckpoint, Customer, SYNC_CHECKPOINT_ID};

/// Infinite change-feed subscription on the source collection for real-time
/// sync runs.
///
/// The subscription starts immediately after the checkpointed resume token
/// when one exists, otherwise at the current tail of the feed. Only insert and
/// update events are forwarded; every other event kind is skipped while the
/// cursor still advances past it, so resumption stays correct. Updates are
/// subscribed with `update_lookup` so each forwarded event carries the full
/// post-image of the record.
#[derive(Debug, Clone)]
pub struct MongoChangeSource {
    source: Collection<Customer>,
    checkpoints: Collection<ChangeCheckpoint>,
}

impl MongoChangeSource {
    /// Creates a change source over the configured collections of `database`.
    pub fn new(database: &Database, collections: &CollectionsConfig) -> Self {
        Self {
            source: database.collection(&collections.source),
            checkpoints: database.collection(&collections.sync_progress),
        }
    }
}

impl SourceStream for MongoChangeSource {
    type Position = mongodb::change_stream::event::ResumeToken;

    const TERMINATES: bool = false;

    fn name() -> &'static str {
        "sync"
    }

    async fn create_or_resume(&mut self) -> SyncResult<SourceItems<Self::Position>> {
        let checkpoint = self
            .checkpoints
            .find_one(doc! { "_id": SYNC_CHECKPOINT_ID })
            .await?;

        let mut watch = self
            .source
            .watch()
            .full_document(FullDocumentType::UpdateLookup);

        match &checkpoint {
            Some(checkpoint) => {
                info!("resuming change feed after the stored resume token");
                watch = watch.start_after(checkpoint.token.clone());
            }
            None => {
                info!("no resume token found, subscribing at the current tail");
            }
        }

        let change_stream = watch.await?;

        let items = change_stream.filter_map(|event| async move {
            match event {
                Ok(event) => {
                    let position = event.id.clone();
                    match event.operation_type {
                        OperationType::Insert | OperationType::Update => {
                            match event.full_document {
                                Some(record) => Some(Ok(SourceItem { record, position })),
                                // The subscription requests full post-images, so a
                                // missing document means the feed handed us a shape
                                // we cannot replicate without corrupting the output.
                                None => Some(Err(sync_error!(
                                    ErrorKind::InvalidData,
                                    "Change event carries no full document",
                                    format!("insert or update event at position {position:?}")
                                ))),
                            }
                        }
                        _ => None,
                    }
                }
                Err(err) => Some(Err(err.into())),
            }
        });

        Ok(items.boxed())
    }

    async fn close(&mut self) -> SyncResult<()> {
        // The subscription is owned by the stream and released when it drops;
        // closing a source that never opened is a no-op.
        debug!("change source closed");

        Ok(())
    }
}
