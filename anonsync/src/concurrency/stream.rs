use core::pin::Pin;
use core::task::{Context, Poll};
use std::mem;
use std::time::Duration;

use anonsync_config::shared::BatchConfig;
use futures::{Future, Stream, ready};
use pin_project_lite::pin_project;
use tracing::info;

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};

// Implementation adapted from:
//  https://github.com/tokio-rs/tokio/blob/master/tokio-stream/src/stream_ext/chunks_timeout.rs.
pin_project! {
    /// A stream adapter that coalesces items into batches by size and idle time.
    ///
    /// Batches are emitted when:
    /// - the buffer reaches `max_size` items (the armed idle timer is
    ///   cancelled so it cannot fire for an already-emitted batch);
    /// - `max_fill_ms` elapsed since the first unflushed item arrived;
    /// - the inner stream ends with a non-empty remainder;
    /// - a shutdown signal is observed, in which case the remainder is emitted
    ///   tagged as a shutdown batch and the stream terminates.
    ///
    /// The idle deadline is armed when the first item of a batch is buffered,
    /// so a slow trickle of records is flushed at most `max_fill_ms` after the
    /// oldest one started waiting.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct BatchStream<B, S: Stream<Item = B>> {
        #[pin]
        stream: S,
        #[pin]
        deadline: Option<tokio::time::Sleep>,
        shutdown_rx: ShutdownRx,
        items: Vec<S::Item>,
        batch_config: BatchConfig,
        inner_stream_ended: bool,
        stream_stopped: bool,
    }
}

impl<B, S: Stream<Item = B>> BatchStream<B, S> {
    /// Creates a new [`BatchStream`] wrapping `stream`.
    pub fn wrap(stream: S, batch_config: BatchConfig, shutdown_rx: ShutdownRx) -> Self {
        BatchStream {
            stream,
            deadline: None,
            shutdown_rx,
            items: Vec::with_capacity(batch_config.max_size),
            batch_config,
            inner_stream_ended: false,
            stream_stopped: false,
        }
    }
}

impl<B, S: Stream<Item = B>> Stream for BatchStream<B, S> {
    type Item = ShutdownResult<Vec<S::Item>, Vec<S::Item>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.as_mut().project();

        // Fast path: a previous poll already terminated the stream.
        if *this.inner_stream_ended || *this.stream_stopped {
            return Poll::Ready(None);
        }

        // Shutdown takes priority over all other conditions. The accumulated
        // remainder is handed back so the caller can flush it before
        // stopping; even an empty remainder is returned so the caller learns
        // that shutdown occurred.
        if this.shutdown_rx.has_changed().unwrap_or(false) {
            info!("batch stream stopping due to shutdown signal");

            *this.stream_stopped = true;
            this.shutdown_rx.mark_unchanged();

            return Poll::Ready(Some(ShutdownResult::Shutdown(mem::take(this.items))));
        }

        loop {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => break,
                Poll::Ready(Some(item)) => {
                    this.items.push(item);

                    if this.items.len() >= this.batch_config.max_size {
                        // Size-triggered flush. Cancelling the deadline here
                        // guarantees the timer cannot fire again for a batch
                        // that was already emptied.
                        this.deadline.set(None);

                        return Poll::Ready(Some(ShutdownResult::Ok(mem::take(this.items))));
                    }

                    if this.items.len() == 1 {
                        // First unflushed item: arm the one-shot idle timer.
                        this.deadline
                            .set(Some(tokio::time::sleep(Duration::from_millis(
                                this.batch_config.max_fill_ms,
                            ))));
                    }
                }
                Poll::Ready(None) => {
                    // Inner stream finished: emit the non-empty remainder,
                    // then terminate. Flushing the trailing partial batch here
                    // is what makes a bounded reindex run lossless.
                    *this.inner_stream_ended = true;
                    this.deadline.set(None);

                    let last = if this.items.is_empty() {
                        None
                    } else {
                        Some(ShutdownResult::Ok(mem::take(this.items)))
                    };

                    return Poll::Ready(last);
                }
            }
        }

        // No more items available right now: flush on an expired idle
        // deadline. Polling the deadline registers the waker when it has not
        // elapsed yet.
        if !this.items.is_empty() {
            if let Some(deadline) = this.deadline.as_mut().as_pin_mut() {
                ready!(deadline.poll(cx));
                this.deadline.set(None);

                return Poll::Ready(Some(ShutdownResult::Ok(mem::take(this.items))));
            }
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use futures::StreamExt;
    use futures::future::poll_fn;
    use futures::stream;

    fn batch_config(max_size: usize, max_fill_ms: u64) -> BatchConfig {
        BatchConfig {
            max_size,
            max_fill_ms,
        }
    }

    /// Polls the stream once and asserts it is pending.
    async fn assert_pending<S: Stream + Unpin>(stream: &mut S) {
        poll_fn(|cx| match stream.poll_next_unpin(cx) {
            Poll::Pending => Poll::Ready(()),
            _ => panic!("expected pending"),
        })
        .await;
    }

    #[tokio::test]
    async fn reaching_max_size_flushes_exactly_once() {
        let (_, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(vec![1, 2, 3]).chain(stream::pending());
        let mut batches = Box::pin(BatchStream::wrap(inner, batch_config(3, 10), shutdown_rx));

        let batch = batches.next().await;
        assert_eq!(batch, Some(ShutdownResult::Ok(vec![1, 2, 3])));

        // The size-triggered flush cancelled the idle timer, so with no new
        // items the stream must stay pending instead of emitting again.
        assert_pending(&mut batches).await;
    }

    #[tokio::test(start_paused = true)]
    async fn idle_deadline_flushes_a_partial_batch() {
        let (_, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(vec![1, 2]).chain(stream::pending());
        let mut batches = Box::pin(BatchStream::wrap(
            inner,
            batch_config(1000, 1000),
            shutdown_rx,
        ));

        // Far below the size threshold, so only the idle deadline can emit.
        let batch = batches.next().await;
        assert_eq!(batch, Some(ShutdownResult::Ok(vec![1, 2])));

        // Exactly one flush: the buffer is empty and no timer is armed.
        assert_pending(&mut batches).await;
    }

    #[tokio::test]
    async fn inner_stream_end_flushes_the_remainder() {
        let (_, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(vec![1, 2]);
        let mut batches = Box::pin(BatchStream::wrap(
            inner,
            batch_config(10, 10_000),
            shutdown_rx,
        ));

        assert_eq!(batches.next().await, Some(ShutdownResult::Ok(vec![1, 2])));
        assert_eq!(batches.next().await, None);
    }

    #[tokio::test]
    async fn empty_inner_stream_ends_without_a_batch() {
        let (_, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(Vec::<i32>::new());
        let mut batches = Box::pin(BatchStream::wrap(
            inner,
            batch_config(10, 10_000),
            shutdown_rx,
        ));

        assert_eq!(batches.next().await, None);
    }

    #[tokio::test]
    async fn shutdown_hands_back_the_pending_remainder() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(vec![1, 2]).chain(stream::pending());
        let mut batches = Box::pin(BatchStream::wrap(
            inner,
            batch_config(10, 10_000),
            shutdown_rx,
        ));

        // Buffer the two items; nothing to emit yet.
        assert_pending(&mut batches).await;

        shutdown_tx.shutdown().unwrap();

        assert_eq!(
            batches.next().await,
            Some(ShutdownResult::Shutdown(vec![1, 2]))
        );
        assert_eq!(batches.next().await, None);
    }

    #[tokio::test]
    async fn max_size_of_one_flushes_every_item() {
        let (_, shutdown_rx) = create_shutdown_channel();
        let inner = stream::iter(vec![1, 2]).chain(stream::pending());
        let mut batches = Box::pin(BatchStream::wrap(inner, batch_config(1, 10_000), shutdown_rx));

        assert_eq!(batches.next().await, Some(ShutdownResult::Ok(vec![1])));
        assert_eq!(batches.next().await, Some(ShutdownResult::Ok(vec![2])));
        assert_pending(&mut batches).await;
    }
}
