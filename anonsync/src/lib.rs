//! Continuous anonymizing replication between MongoDB collections.
//!
//! The pipeline reads customer records from a source collection, replaces the
//! personal fields with deterministic one-way digests, and upserts the result
//! into an output collection. Progress is checkpointed durably in the same
//! transaction as each batch of writes, so an interrupted run resumes from the
//! last committed position without losing records.
//!
//! Two source flavors share one contract: a finite reindex scan over existing
//! records and an infinite change-feed subscription for live inserts and
//! updates.

pub mod anonymizer;
pub mod concurrency;
pub mod destination;
pub mod error;
mod macros;
pub mod pipeline;
pub mod source;
pub mod types;
