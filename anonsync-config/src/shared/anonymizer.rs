use serde::Deserialize;

use crate::shared::ValidationError;

/// Anonymizer configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnonymizerConfig {
    /// Length in characters of each digest replacing a personal field.
    ///
    /// The digests are hex-encoded, so the value must be even; each
    /// replacement string encodes `hash_length / 2` digest bytes.
    #[serde(default = "default_hash_length")]
    pub hash_length: usize,
}

impl AnonymizerConfig {
    /// Default digest length in characters.
    pub const DEFAULT_HASH_LENGTH: usize = 8;

    /// Validates the anonymizer configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hash_length < 2 || self.hash_length % 2 != 0 {
            return Err(ValidationError::HashLengthInvalid(self.hash_length));
        }

        Ok(())
    }
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            hash_length: default_hash_length(),
        }
    }
}

fn default_hash_length() -> usize {
    AnonymizerConfig::DEFAULT_HASH_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hash_length_is_valid() {
        let config = AnonymizerConfig::default();

        assert_eq!(config.hash_length, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn odd_and_tiny_lengths_are_rejected() {
        for hash_length in [0, 1, 7] {
            let config = AnonymizerConfig { hash_length };
            assert!(matches!(
                config.validate(),
                Err(ValidationError::HashLengthInvalid(_))
            ));
        }
    }
}
