use serde::Deserialize;

use crate::shared::{
    AnonymizerConfig, BatchConfig, CollectionsConfig, MongoConnectionConfig, ValidationError,
};

/// Configuration for one replication pipeline.
///
/// Contains everything required to run a replication pass: the MongoDB
/// connection, the collection names, batching parameters, and the anonymizer
/// settings. The mode (reindex vs sync) is not configuration; it is selected
/// at startup.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking secrets in the config into serialized forms.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineConfig {
    /// Connection to the MongoDB deployment holding every collection the
    /// pipeline touches.
    pub connection: MongoConnectionConfig,
    /// Names of the source, output, and checkpoint collections.
    #[serde(default)]
    pub collections: CollectionsConfig,
    /// Batch coalescing configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Anonymizer configuration.
    #[serde(default)]
    pub anonymizer: AnonymizerConfig,
}

impl PipelineConfig {
    /// Validates the complete pipeline configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.connection.validate()?;
        self.collections.validate()?;
        self.batch.validate()?;
        self.anonymizer.validate()?;

        Ok(())
    }
}
