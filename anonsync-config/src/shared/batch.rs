use serde::Deserialize;

use crate::shared::ValidationError;

/// Batch coalescing configuration for the pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Number of buffered records that triggers an immediate flush.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
    /// Milliseconds after the first unflushed record before a partial batch
    /// is flushed anyway.
    #[serde(default = "default_batch_max_fill_ms")]
    pub max_fill_ms: u64,
}

impl BatchConfig {
    /// Default flush threshold.
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Default idle-flush interval in milliseconds.
    pub const DEFAULT_MAX_FILL_MS: u64 = 1000;

    /// Validates batch configuration settings.
    ///
    /// Both values must be positive: a zero threshold would flush forever and
    /// a zero interval would defeat coalescing entirely.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::BatchMaxSizeZero);
        }
        if self.max_fill_ms == 0 {
            return Err(ValidationError::BatchMaxFillZero);
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
            max_fill_ms: default_batch_max_fill_ms(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

fn default_batch_max_fill_ms() -> u64 {
    BatchConfig::DEFAULT_MAX_FILL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_valid() {
        let config = BatchConfig::default();

        assert_eq!(config.max_size, 1000);
        assert_eq!(config.max_fill_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let config = BatchConfig {
            max_size: 0,
            max_fill_ms: 1000,
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::BatchMaxSizeZero)
        ));

        let config = BatchConfig {
            max_size: 10,
            max_fill_ms: 0,
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::BatchMaxFillZero)
        ));
    }
}
