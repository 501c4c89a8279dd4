use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Batch size threshold cannot be zero.
    #[error("`batch.max_size` must be greater than 0")]
    BatchMaxSizeZero,
    /// Idle-flush interval cannot be zero.
    #[error("`batch.max_fill_ms` must be greater than 0")]
    BatchMaxFillZero,
    /// Digest length must be even (hex encoding of whole bytes) and at least 2.
    #[error("`anonymizer.hash_length` must be an even number of at least 2, got {0}")]
    HashLengthInvalid(usize),
    /// Connection string cannot be empty.
    #[error("`connection.uri` cannot be empty")]
    MissingConnectionUri,
    /// Database name cannot be empty.
    #[error("`connection.database` cannot be empty")]
    MissingDatabaseName,
    /// A collection identifier cannot be empty.
    #[error("collection name for `{0}` cannot be empty")]
    EmptyCollectionName(&'static str),
}
