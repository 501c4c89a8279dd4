use futures::StreamExt;
use futures::stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::destination::memory::MemoryDestination;
use crate::error::{ErrorKind, SyncResult};
use crate::source::base::{SourceItem, SourceItems, SourceStream};
use crate::types::{Customer, CustomerId};
use crate::{bail, sync_error};

/// Finite in-memory reindex source for tests and development.
///
/// Reads its resume position from the paired [`MemoryDestination`], which in
/// the in-memory world is also the checkpoint store, so the checkpoint stays
/// the single source of truth for resumability.
#[derive(Debug, Clone)]
pub struct MemoryReindexSource {
    records: Vec<Customer>,
    destination: MemoryDestination<CustomerId>,
}

impl MemoryReindexSource {
    /// Creates a reindex source over `records`, resuming from the checkpoint
    /// committed to `destination`.
    pub fn new(records: Vec<Customer>, destination: MemoryDestination<CustomerId>) -> Self {
        Self {
            records,
            destination,
        }
    }
}

impl SourceStream for MemoryReindexSource {
    type Position = CustomerId;

    const TERMINATES: bool = true;

    fn name() -> &'static str {
        "memory-reindex"
    }

    async fn create_or_resume(&mut self) -> SyncResult<SourceItems<CustomerId>> {
        let resume_after = self.destination.checkpoint().await;

        let mut records: Vec<Customer> = self
            .records
            .iter()
            .filter(|record| resume_after.is_none_or(|last| record.id > last))
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);

        debug!(records = records.len(), "memory reindex scan opened");

        let items = records.into_iter().map(|record| {
            Ok(SourceItem {
                position: record.id,
                record,
            })
        });

        Ok(stream::iter(items).boxed())
    }

    async fn close(&mut self) -> SyncResult<()> {
        Ok(())
    }
}

/// Kind of an in-memory change event, mirroring the event kinds a real change
/// feed produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

/// A single event on the in-memory change feed.
#[derive(Debug, Clone)]
pub struct MemoryChangeEvent {
    pub kind: MemoryChangeKind,
    pub record: Option<Customer>,
    pub token: u64,
}

impl MemoryChangeEvent {
    /// An insert event carrying the new record.
    pub fn insert(record: Customer, token: u64) -> Self {
        Self {
            kind: MemoryChangeKind::Insert,
            record: Some(record),
            token,
        }
    }

    /// An update event carrying the full post-image of the record.
    pub fn update(record: Customer, token: u64) -> Self {
        Self {
            kind: MemoryChangeKind::Update,
            record: Some(record),
            token,
        }
    }

    /// A delete event; deletes carry no record and are never forwarded.
    pub fn delete(token: u64) -> Self {
        Self {
            kind: MemoryChangeKind::Delete,
            record: None,
            token,
        }
    }

    /// Any other feed event kind the pipeline skips.
    pub fn other(token: u64) -> Self {
        Self {
            kind: MemoryChangeKind::Other,
            record: None,
            token,
        }
    }
}

/// Infinite in-memory change source for tests and development, fed through an
/// unbounded channel.
///
/// Events at or before the checkpointed token are filtered out on resume, the
/// way a real feed subscription positioned after a resume token never
/// redelivers the checkpointed event. Closing the sender ends the feed, which
/// the pipeline treats as a feed failure, exactly like the production source.
#[derive(Debug)]
pub struct MemoryChangeSource {
    events: Option<mpsc::UnboundedReceiver<MemoryChangeEvent>>,
    destination: MemoryDestination<u64>,
}

impl MemoryChangeSource {
    /// Creates a change source resuming from the checkpoint committed to
    /// `destination`, plus the sender used to feed it events.
    pub fn new(
        destination: MemoryDestination<u64>,
    ) -> (Self, mpsc::UnboundedSender<MemoryChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let source = Self {
            events: Some(rx),
            destination,
        };

        (source, tx)
    }
}

impl SourceStream for MemoryChangeSource {
    type Position = u64;

    const TERMINATES: bool = false;

    fn name() -> &'static str {
        "memory-sync"
    }

    async fn create_or_resume(&mut self) -> SyncResult<SourceItems<u64>> {
        let Some(rx) = self.events.take() else {
            bail!(
                ErrorKind::InvalidState,
                "Memory change feed was already consumed"
            );
        };

        let resume_after = self.destination.checkpoint().await;

        let feed = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        let items = feed.filter_map(move |event| async move {
            if let Some(last) = resume_after {
                if event.token <= last {
                    return None;
                }
            }

            match event.kind {
                MemoryChangeKind::Insert | MemoryChangeKind::Update => match event.record {
                    Some(record) => Some(Ok(SourceItem {
                        record,
                        position: event.token,
                    })),
                    None => Some(Err(sync_error!(
                        ErrorKind::InvalidData,
                        "Change event carries no record",
                        format!("insert or update event at token {}", event.token)
                    ))),
                },
                _ => None,
            }
        });

        Ok(items.boxed())
    }

    async fn close(&mut self) -> SyncResult<()> {
        // Dropping the receiver (if still held) tears the feed down.
        self.events = None;

        Ok(())
    }
}
