//! Error types and result definitions for replication operations.
//!
//! Provides a structured error system with classification and captured
//! diagnostic metadata. [`SyncError`] carries a kind, a static description, an
//! optional dynamic detail, an optional source error, and the callsite that
//! created it.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for replication operations using [`SyncError`] as the error type.
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type for replication operations.
#[derive(Debug, Clone)]
pub struct SyncError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Specific categories of errors that can occur during replication.
///
/// The kinds are coarse on purpose: they distinguish the failure modes the
/// pipeline reacts to differently, not every way the driver can fail.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Could not establish or keep a connection to the document store.
    ConnectionFailed,
    /// A read or write against the document store failed.
    QueryFailed,
    /// A multi-document transaction failed to commit and was aborted.
    TransactionFailed,
    /// A record or change event had an unexpected shape.
    InvalidData,
    /// The change feed terminated even though the pipeline expected it to tail forever.
    ChangeFeedEnded,
    /// A component was used in a state it does not support.
    InvalidState,
    /// The pipeline worker task panicked.
    PipelineWorkerPanic,
    /// Invalid configuration.
    ConfigError,
    /// Anything that could not be classified.
    Unknown,
}

impl SyncError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// The stored source is preserved across clones and exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`SyncError`] from its components, capturing the caller location.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SyncError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for SyncError {
    fn eq(&self, other: &SyncError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

impl<D> From<(ErrorKind, D)> for SyncError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, description): (ErrorKind, D)) -> Self {
        SyncError::from_components(kind, description.into(), None, None)
    }
}

impl<D, T> From<(ErrorKind, D, T)> for SyncError
where
    D: Into<Cow<'static, str>>,
    T: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, D, T)) -> Self {
        SyncError::from_components(kind, description.into(), Some(detail.into()), None)
    }
}

impl From<mongodb::error::Error> for SyncError {
    /// Classifies a driver error into an [`ErrorKind`] while keeping the
    /// original error as the source.
    #[track_caller]
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind as MongoErrorKind;

        let kind = match &*err.kind {
            MongoErrorKind::Authentication { .. }
            | MongoErrorKind::Io(..)
            | MongoErrorKind::ServerSelection { .. } => ErrorKind::ConnectionFailed,
            MongoErrorKind::Transaction { .. } => ErrorKind::TransactionFailed,
            MongoErrorKind::Command(..) | MongoErrorKind::Write(..) => ErrorKind::QueryFailed,
            MongoErrorKind::BsonDeserialization(..) | MongoErrorKind::BsonSerialization(..) => {
                ErrorKind::InvalidData
            }
            _ => ErrorKind::Unknown,
        };

        SyncError::from_components(
            kind,
            Cow::Borrowed("MongoDB operation failed"),
            Some(Cow::Owned(err.to_string())),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_error;

    #[test]
    fn errors_with_same_kind_compare_equal() {
        let a = sync_error!(ErrorKind::QueryFailed, "First failure");
        let b = sync_error!(ErrorKind::QueryFailed, "Second failure");
        let c = sync_error!(ErrorKind::InvalidData, "Third failure");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_includes_description_and_detail() {
        let err = sync_error!(
            ErrorKind::InvalidData,
            "Malformed record",
            "missing email separator"
        );

        let rendered = err.to_string();
        assert!(rendered.contains("Malformed record"));
        assert!(rendered.contains("missing email separator"));
        assert!(rendered.contains("[InvalidData]"));
    }

    #[test]
    fn source_is_exposed_through_error_trait() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = sync_error!(ErrorKind::ConnectionFailed, "Connect failed").with_source(io_err);

        assert!(err.source().is_some());
    }
}
