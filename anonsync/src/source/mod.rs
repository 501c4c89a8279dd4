//! Record sources for the replication pipeline.
//!
//! Two production sources share the [`base::SourceStream`] contract: a finite
//! ordered scan for full reindex runs and an infinite change-feed subscription
//! for real-time sync. The [`memory`] sources implement the same contract over
//! in-process data for tests and development.

pub mod base;
pub mod change;
pub mod memory;
pub mod reindex;
