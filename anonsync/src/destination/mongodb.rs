use std::fmt;
use std::marker::PhantomData;

use anonsync_config::shared::CollectionsConfig;
use mongodb::bson::doc;
use mongodb::change_stream::event::ResumeToken;
use mongodb::{Client, ClientSession, Collection, Database};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::destination::base::Destination;
use crate::error::SyncResult;
use crate::types::{
    Batch, ChangeCheckpoint, Customer, CustomerId, REINDEX_CHECKPOINT_ID, ReindexCheckpoint,
    SYNC_CHECKPOINT_ID,
};

/// Maps a batch position to the durable checkpoint record of its replication
/// mode.
///
/// The two modes differ only in what they checkpoint (ordinal key vs resume
/// token) and where; everything else about the transactional write is shared,
/// so [`MongoDestination`] is generic over this trait instead of existing as
/// two near-identical copies.
pub trait ProgressMode: Send + Sync + 'static {
    /// Position type checkpointed by this mode.
    type Position: Clone + fmt::Debug + Send + Sync + 'static;

    /// Checkpoint document written alongside each committed batch.
    type Checkpoint: Serialize + DeserializeOwned + Send + Sync;

    /// Fixed `_id` of the checkpoint singleton.
    const CHECKPOINT_ID: &'static str;

    /// Builds the checkpoint record for a batch ending at `position`.
    fn checkpoint(position: &Self::Position) -> Self::Checkpoint;

    /// Picks this mode's checkpoint collection out of the configuration.
    fn collection_name(collections: &CollectionsConfig) -> &str;
}

/// Progress mode for full reindex runs: checkpoints the last processed key.
#[derive(Debug, Clone, Copy)]
pub struct ReindexProgress;

impl ProgressMode for ReindexProgress {
    type Position = CustomerId;
    type Checkpoint = ReindexCheckpoint;

    const CHECKPOINT_ID: &'static str = REINDEX_CHECKPOINT_ID;

    fn checkpoint(position: &CustomerId) -> ReindexCheckpoint {
        ReindexCheckpoint::new(*position)
    }

    fn collection_name(collections: &CollectionsConfig) -> &str {
        &collections.reindex_progress
    }
}

/// Progress mode for real-time sync runs: checkpoints the resume token.
#[derive(Debug, Clone, Copy)]
pub struct SyncProgress;

impl ProgressMode for SyncProgress {
    type Position = ResumeToken;
    type Checkpoint = ChangeCheckpoint;

    const CHECKPOINT_ID: &'static str = SYNC_CHECKPOINT_ID;

    fn checkpoint(position: &ResumeToken) -> ChangeCheckpoint {
        ChangeCheckpoint::new(position.clone())
    }

    fn collection_name(collections: &CollectionsConfig) -> &str {
        &collections.sync_progress
    }
}

/// MongoDB destination applying each batch inside one session transaction.
///
/// Every record is upserted into the output collection keyed by `_id`,
/// replacing all fields, and the mode's checkpoint singleton is upserted with
/// the batch position; the transaction commits as a unit or is aborted on the
/// first failure, leaving both collections untouched.
#[derive(Debug, Clone)]
pub struct MongoDestination<M: ProgressMode> {
    client: Client,
    output: Collection<Customer>,
    checkpoints: Collection<M::Checkpoint>,
    _mode: PhantomData<M>,
}

impl<M: ProgressMode> MongoDestination<M> {
    /// Creates a destination over the configured collections of `database`.
    ///
    /// The client is the one the database handle came from; it owns the
    /// sessions used for the transactional writes.
    pub fn new(client: Client, database: &Database, collections: &CollectionsConfig) -> Self {
        Self {
            client,
            output: database.collection(&collections.output),
            checkpoints: database.collection(M::collection_name(collections)),
            _mode: PhantomData,
        }
    }

    /// Upserts the batch records and the checkpoint inside `session`.
    async fn apply_batch(
        &self,
        session: &mut ClientSession,
        batch: &Batch<M::Position>,
    ) -> SyncResult<()> {
        for record in &batch.records {
            self.output
                .replace_one(doc! { "_id": record.id }, record)
                .upsert(true)
                .session(&mut *session)
                .await?;
        }

        let checkpoint = M::checkpoint(&batch.position);
        self.checkpoints
            .replace_one(doc! { "_id": M::CHECKPOINT_ID }, &checkpoint)
            .upsert(true)
            .session(session)
            .await?;

        Ok(())
    }
}

impl<M: ProgressMode> Destination for MongoDestination<M> {
    type Position = M::Position;

    fn name() -> &'static str {
        "mongodb"
    }

    async fn upsert_with_progress(&self, batch: Batch<M::Position>) -> SyncResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        match self.apply_batch(&mut session, &batch).await {
            Ok(()) => {
                session.commit_transaction().await?;

                debug!(
                    records = batch.len(),
                    position = ?batch.position,
                    "batch and checkpoint committed"
                );

                Ok(())
            }
            Err(err) => {
                // Abort so neither the records nor the checkpoint become
                // observable; the primary error is the one worth propagating.
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!(error = %abort_err, "failed to abort the batch transaction");
                }

                Err(err)
            }
        }
    }
}
