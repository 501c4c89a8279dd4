//! Anonymizing replication service binary.
//!
//! Runs either a bounded full-reindex pass or an unbounded real-time sync
//! against the configured MongoDB deployment. Configuration comes from the
//! `configuration/` directory plus `APP_*` environment overrides; the mode is
//! selected on the command line. SIGINT and SIGTERM trigger a graceful
//! shutdown that flushes the pending batch before exiting, and the process
//! exit status distinguishes a clean shutdown from an error exit.

use clap::Parser;
use tracing::error;

use crate::cli::Cli;
use crate::config::load_replicator_config;
use crate::core::start_replicator_with_config;
use crate::error::{ReplicatorError, ReplicatorResult};

mod cli;
mod config;
mod core;
mod error;

fn main() -> ReplicatorResult<()> {
    let cli = Cli::parse();

    let replicator_config = load_replicator_config()?;

    anonsync_telemetry::tracing::init_tracing(env!("CARGO_BIN_NAME"))
        .map_err(ReplicatorError::Config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    if let Err(err) = runtime.block_on(start_replicator_with_config(replicator_config, cli.mode)) {
        error!("{err}");

        return Err(err);
    }

    Ok(())
}
