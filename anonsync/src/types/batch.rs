use crate::source::base::SourceItem;
use crate::types::Customer;

/// An ordered batch of anonymized records together with the source position of
/// the last record in it.
///
/// The batch is owned exclusively by whoever holds it: the coalescer while it
/// accumulates, the write loop while the transactional upsert is in flight. A
/// batch is only constructed for a non-empty set of records, so `position`
/// always refers to a real item.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<P> {
    pub records: Vec<Customer>,
    pub position: P,
}

impl<P: Clone> Batch<P> {
    /// Builds a batch from coalesced source items, taking the position of the
    /// last item as the batch position.
    ///
    /// Returns [`None`] for an empty set of items: there is nothing to write
    /// and no position to checkpoint.
    pub fn from_items(items: Vec<SourceItem<P>>) -> Option<Self> {
        let position = items.last()?.position.clone();
        let records = items.into_iter().map(|item| item.record).collect();

        Some(Self { records, position })
    }
}

impl<P> Batch<P> {
    /// Returns the number of records in this batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if this batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
