use std::error::Error;

use anonsync::error::SyncError;
use thiserror::Error;

/// Result type for replicator operations.
pub type ReplicatorResult<T> = Result<T, ReplicatorError>;

/// Error type for the replicator service.
///
/// Wraps [`SyncError`] for pipeline errors and provides variants for
/// infrastructure errors. Returned from `main`, so any variant turns into a
/// non-zero process exit status.
#[derive(Debug, Error)]
pub enum ReplicatorError {
    /// Pipeline or replication-related error.
    #[error("{0}")]
    Sync(#[from] SyncError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[source] Box<dyn Error + Send + Sync>),
    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReplicatorError {
    /// Creates a configuration error from any boxed source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ReplicatorError::Config(Box::new(err))
    }
}
