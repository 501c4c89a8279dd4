//! Graceful shutdown primitives built on watch channels.
//!
//! A shutdown channel carries no payload: the signal is the change itself.
//! Every receiver subscribed before the signal observes it exactly once via
//! [`tokio::sync::watch::Receiver::has_changed`], which lets stream adapters
//! poll for shutdown without consuming the notification meant for others.

use tokio::sync::watch;

/// Receiver side of the shutdown channel.
pub type ShutdownRx = watch::Receiver<()>;

/// Transmitter side of the shutdown channel.
///
/// Cloneable so the pipeline can hand a handle to whoever translates external
/// termination signals into a shutdown request.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Signals shutdown to all subscribed receivers.
    ///
    /// Fails only if every receiver has already been dropped, which means the
    /// pipeline is no longer running.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver that observes signals sent after this call.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Creates a connected shutdown channel pair.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}

/// Outcome of an operation that can be cut short by a shutdown signal.
///
/// Both variants can carry data: a shutdown observed mid-batch still hands
/// back the records accumulated so far so they can be flushed before the
/// pipeline stops.
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownResult<T, U> {
    /// The operation completed normally.
    Ok(T),
    /// A shutdown signal arrived; the payload is whatever was pending.
    Shutdown(U),
}
