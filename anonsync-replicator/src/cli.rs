use clap::{Parser, Subcommand};

/// Command line surface of the replicator.
#[derive(Debug, Parser)]
#[command(name = "anonsync-replicator", about = "Anonymizing MongoDB replicator")]
pub struct Cli {
    #[command(subcommand)]
    pub mode: ReplicationMode,
}

/// Replication strategy selected at startup.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ReplicationMode {
    /// One-time catch-up pass over existing records, resuming after the last
    /// checkpointed key.
    Reindex,
    /// Live pass tailing the change feed, resuming after the last
    /// checkpointed token.
    Sync,
}
