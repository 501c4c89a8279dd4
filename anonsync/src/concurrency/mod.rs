//! Concurrency utilities for coordinating the replication pipeline.
//!
//! The [`shutdown`] module implements a watch-based shutdown pattern: a single
//! signal terminates the pipeline at a safe batch boundary, pending records
//! are flushed before the worker stops, and resource cleanup happens after the
//! in-flight transaction settles.
//!
//! The [`stream`] module implements the batch coalescer as a stream adapter:
//! record arrival, the idle-flush timer, and the shutdown signal are all
//! observed inside one poll loop, so the pending batch never needs a lock.

pub mod shutdown;
pub mod stream;
