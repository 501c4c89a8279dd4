use mongodb::bson::DateTime;
use mongodb::change_stream::event::ResumeToken;
use serde::{Deserialize, Serialize};

use crate::types::CustomerId;

/// Fixed `_id` of the reindex checkpoint singleton.
pub const REINDEX_CHECKPOINT_ID: &str = "REINDEX_PROGRESS";

/// Fixed `_id` of the change-feed checkpoint singleton.
pub const SYNC_CHECKPOINT_ID: &str = "RESUME_TOKEN";

/// Durable marker of reindex progress.
///
/// A singleton document holding the primary key of the most recently committed
/// source record. Absence means the scan starts from the beginning. The key is
/// monotonically increasing across commits since the reindex cursor is ordered
/// ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReindexCheckpoint {
    #[serde(rename = "_id")]
    pub id: String,
    pub last_processed_id: CustomerId,
    pub updated_at: DateTime,
}

impl ReindexCheckpoint {
    /// Builds the checkpoint record for a freshly committed batch ending at
    /// `last_processed_id`.
    pub fn new(last_processed_id: CustomerId) -> Self {
        Self {
            id: REINDEX_CHECKPOINT_ID.to_owned(),
            last_processed_id,
            updated_at: DateTime::now(),
        }
    }
}

/// Durable marker of change-feed progress.
///
/// A singleton document holding the opaque resume token of the last change
/// event whose batch was committed. Absence means the subscription starts at
/// the current tail of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeCheckpoint {
    #[serde(rename = "_id")]
    pub id: String,
    pub token: ResumeToken,
    pub updated_at: DateTime,
}

impl ChangeCheckpoint {
    /// Builds the checkpoint record for a freshly committed batch ending at
    /// `token`.
    pub fn new(token: ResumeToken) -> Self {
        Self {
            id: SYNC_CHECKPOINT_ID.to_owned(),
            token,
            updated_at: DateTime::now(),
        }
    }
}
