use serde::Deserialize;

use crate::shared::{PipelineConfig, ValidationError};

/// Complete configuration for the replicator service.
///
/// Typically loaded from configuration files at startup via
/// [`crate::load_config`].
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking secrets in the config into serialized forms.
#[derive(Clone, Debug, Deserialize)]
pub struct ReplicatorConfig {
    /// Configuration for the replication pipeline.
    pub pipeline: PipelineConfig,
}

impl ReplicatorConfig {
    /// Validates the complete replicator configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()
    }
}
