//! Destinations that apply anonymized batches transactionally.
//!
//! A destination owns the exactly-once application guarantee: the batch
//! upserts and the checkpoint write either both commit or both roll back.
//! [`mongodb`] is the production implementation; [`memory`] keeps everything
//! in process for tests and development.

pub mod base;
pub mod memory;
pub mod mongodb;
