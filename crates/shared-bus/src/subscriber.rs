//! # Log Subscriber
//!
//! Defines the subscription side of the log bus.

use crate::events::LogFilter;
use shared_types::LogBatch;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The log bus was closed.
    #[error("Log bus closed")]
    Closed,
}

/// A subscription handle for receiving log batches.
///
/// When dropped, the bus's subscriber count is decremented.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<LogBatch>,

    /// Filter for this subscription.
    filter: LogFilter,

    /// Shared live-subscription counter.
    active: Arc<AtomicUsize>,
}

impl Subscription {
    /// Create a new subscription.
    pub(crate) fn new(
        receiver: broadcast::Receiver<LogBatch>,
        filter: LogFilter,
        active: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            receiver,
            filter,
            active,
        }
    }

    /// Receive the next batch that matches the filter.
    ///
    /// # Returns
    ///
    /// - `Some(batch)` - The next matching batch
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<LogBatch> {
        loop {
            let batch = match self.receiver.recv().await {
                Ok(b) => b,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some log batches dropped");
                    continue;
                }
            };

            if self.filter.matches(&batch) {
                return Some(batch);
            }
        }
    }

    /// Try to receive the next batch without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(batch))` - A batch was available and matched
    /// - `Ok(None)` - No batch available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<LogBatch>, SubscriptionError> {
        loop {
            let batch = match self.receiver.try_recv() {
                Ok(b) => b,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.filter.matches(&batch) {
                return Ok(Some(batch));
            }
        }
    }

    /// Get the filter for this subscription.
    #[must_use]
    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!("Log subscription dropped");
    }
}

/// A stream wrapper for subscriptions.
///
/// Implements `tokio_stream::Stream` for use with stream combinators.
pub struct LogStream {
    inner: BroadcastStream<LogBatch>,
    filter: LogFilter,
    // Held for the subscriber count; the receiver itself moved into `inner`.
    _guard: SubscriptionGuard,
}

struct SubscriptionGuard(Arc<AtomicUsize>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LogStream {
    /// Create a new log stream from a subscription.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        let receiver = subscription.receiver.resubscribe();
        let filter = subscription.filter.clone();
        let active = subscription.active.clone();
        // The resubscribed receiver replaces the original handle.
        active.fetch_add(1, Ordering::SeqCst);
        drop(subscription);

        Self {
            inner: BroadcastStream::new(receiver),
            filter,
            _guard: SubscriptionGuard(active),
        }
    }

    /// Get the filter for this stream.
    #[must_use]
    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }
}

impl Stream for LogStream {
    type Item = LogBatch;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(batch))) => {
                    if self.filter.matches(&batch) {
                        return Poll::Ready(Some(batch));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(count)))) => {
                    debug!(lagged = count, "Log stream lagged, some batches dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::InMemoryLogBus;
    use crate::LogPublisher;
    use shared_types::{Pubkey, Signature};
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    fn batch_for(program: &Pubkey, line: &str) -> LogBatch {
        LogBatch {
            signature: Signature::default(),
            err: None,
            logs: vec![format!("Program {program} invoke [1]"), line.to_string()],
        }
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryLogBus::new();
        let mut sub = bus.subscribe(LogFilter::all());
        let program = Pubkey::new_unique();

        bus.publish(batch_for(&program, "Program log: hi")).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("batch");

        assert_eq!(received.logs[1], "Program log: hi");
    }

    #[tokio::test]
    async fn test_subscription_filter() {
        let bus = InMemoryLogBus::new();
        let program = Pubkey::new_unique();
        let other = Pubkey::new_unique();

        let mut sub = bus.subscribe(LogFilter::program(program));

        // Should be filtered
        bus.publish(batch_for(&other, "Program log: other")).await;
        // Should be received
        bus.publish(batch_for(&program, "Program log: mine")).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("batch");

        assert_eq!(received.logs[1], "Program log: mine");
    }

    #[tokio::test]
    async fn test_subscription_drop_cleanup() {
        let bus = InMemoryLogBus::new();

        {
            let _sub1 = bus.subscribe(LogFilter::all());
            let _sub2 = bus.subscribe(LogFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = InMemoryLogBus::new();
        let mut sub = bus.subscribe(LogFilter::all());

        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_log_stream_yields_matching() {
        let bus = InMemoryLogBus::new();
        let program = Pubkey::new_unique();
        let mut stream = bus.log_stream(LogFilter::program(program));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(batch_for(&Pubkey::new_unique(), "Program log: skip")).await;
        bus.publish(batch_for(&program, "Program log: take")).await;

        let received = timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("batch");
        assert_eq!(received.logs[1], "Program log: take");

        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
