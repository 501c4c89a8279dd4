use serde::Deserialize;

use crate::shared::ValidationError;

/// Names of the collections the pipeline reads and writes.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CollectionsConfig {
    /// Source collection holding the customer records.
    #[serde(default = "default_source")]
    pub source: String,
    /// Output collection receiving the anonymized records.
    #[serde(default = "default_output")]
    pub output: String,
    /// Collection holding the reindex checkpoint singleton.
    #[serde(default = "default_reindex_progress")]
    pub reindex_progress: String,
    /// Collection holding the change-feed checkpoint singleton.
    #[serde(default = "default_sync_progress")]
    pub sync_progress: String,
}

impl CollectionsConfig {
    /// Validates that every collection has a name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("collections.source", &self.source),
            ("collections.output", &self.output),
            ("collections.reindex_progress", &self.reindex_progress),
            ("collections.sync_progress", &self.sync_progress),
        ] {
            if value.is_empty() {
                return Err(ValidationError::EmptyCollectionName(field));
            }
        }

        Ok(())
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            reindex_progress: default_reindex_progress(),
            sync_progress: default_sync_progress(),
        }
    }
}

fn default_source() -> String {
    "customers".to_owned()
}

fn default_output() -> String {
    "customers_anonymised".to_owned()
}

fn default_reindex_progress() -> String {
    "customers_full_reindex_transfer_process".to_owned()
}

fn default_sync_progress() -> String {
    "customers_transfer_process".to_owned()
}
