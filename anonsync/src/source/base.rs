use std::fmt;
use std::future::Future;

use futures::stream::BoxStream;

use crate::error::SyncResult;
use crate::types::Customer;

/// A record yielded by a source together with the position needed to
/// checkpoint it.
///
/// The position travels with the record all the way to the destination: the
/// transactional write persists the position of the last record in each
/// committed batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem<P> {
    pub record: Customer,
    pub position: P,
}

/// The lazy sequence produced by a source.
pub type SourceItems<P> = BoxStream<'static, SyncResult<SourceItem<P>>>;

/// Trait for the two replication source flavors.
///
/// Both flavors replay records after a checkpointed position as a single
/// exhaustible sequence; only the notion of position (ordinal key vs opaque
/// resume token) and termination (finite vs infinite) differ, which keeps the
/// coalescer and destination mode-agnostic.
///
/// Dropping the returned stream releases the underlying cursor or
/// subscription; [`SourceStream::close`] exists for the explicit teardown step
/// of the shutdown sequence and must be idempotent, including on a source
/// that never opened.
pub trait SourceStream {
    /// Position type checkpointed for this source.
    type Position: Clone + fmt::Debug + Send + Sync + 'static;

    /// Whether the sequence is expected to end on its own.
    ///
    /// A finite source completing is a successful run; an infinite source
    /// ending is a feed failure the pipeline must surface.
    const TERMINATES: bool;

    /// Returns the name of the source, used in logs.
    fn name() -> &'static str;

    /// Opens the sequence of records, starting after the stored checkpoint
    /// when one exists.
    fn create_or_resume(
        &mut self,
    ) -> impl Future<Output = SyncResult<SourceItems<Self::Position>>> + Send;

    /// Releases the source. Safe to call multiple times.
    fn close(&mut self) -> impl Future<Output = SyncResult<()>> + Send;
}
