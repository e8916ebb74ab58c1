//! Channel: FIFO handoff from push-style producers to a pull-style consumer.
//!
//! `push` never blocks. The consumer drains in arrival order and suspends
//! when the buffer is empty; a push while it is suspended goes straight to
//! it without touching the buffer.
//!
//! Single consumer only: a second concurrent `recv` replaces the first
//! waiter, and the replaced waiter keeps waiting until the next push that
//! reaches it. Fan-out is not supported.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::Stream;
use tokio::sync::oneshot;

struct Inner<T> {
    buffer: VecDeque<T>,
    waiter: Option<oneshot::Sender<T>>,
}

/// Unbounded async FIFO with a single waiting consumer.
pub struct Channel<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Send + 'static> Channel<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffer: VecDeque::new(),
                waiter: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        // A panic while holding this lock cannot leave the buffer half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `value`, or hand it directly to a suspended consumer.
    pub fn push(&self, value: T) {
        let mut inner = self.lock();
        let value = match inner.waiter.take() {
            Some(waiter) => match waiter.send(value) {
                Ok(()) => return,
                // Consumer gave up waiting; keep the value for the next one.
                Err(value) => value,
            },
            None => value,
        };
        inner.buffer.push_back(value);
    }

    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a consumer is currently suspended in [`recv`](Self::recv).
    pub fn has_waiter(&self) -> bool {
        self.lock()
            .waiter
            .as_ref()
            .is_some_and(|waiter| !waiter.is_closed())
    }

    /// Take the oldest value, suspending until one is pushed.
    ///
    /// Cancel-safe: dropping the future while suspended loses nothing.
    pub async fn recv(&self) -> T {
        loop {
            let rx = {
                let mut inner = self.lock();
                if let Some(value) = inner.buffer.pop_front() {
                    return value;
                }
                let (tx, rx) = oneshot::channel();
                inner.waiter = Some(tx);
                rx
            };
            // Err only when another consumer replaced our waiter.
            if let Ok(value) = rx.await {
                return value;
            }
        }
    }

    /// Endless stream draining this channel.
    pub fn stream(self: &Arc<Self>) -> impl Stream<Item = T> + Send + Unpin + use<T> {
        let channel = Arc::clone(self);
        Box::pin(futures::stream::unfold(channel, |channel| async move {
            let value = channel.recv().await;
            Some((value, channel))
        }))
    }
}

impl<T: Send + 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_buffered_values_drain_in_push_order() {
        let channel = Arc::new(Channel::new());
        for i in 0..5 {
            channel.push(i);
        }
        assert_eq!(channel.len(), 5);

        let drained: Vec<i32> = channel.stream().take(5).collect().await;
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn test_push_resolves_waiting_consumer_without_buffering() {
        let channel = Arc::new(Channel::new());
        let consumer = {
            let channel = channel.clone();
            tokio::spawn(async move { channel.recv().await })
        };

        while !channel.has_waiter() {
            tokio::task::yield_now().await;
        }
        channel.push("hello");
        assert_eq!(channel.len(), 0);
        assert_eq!(consumer.await.unwrap(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_pushes_arrive_in_order() {
        let channel = Arc::new(Channel::new());
        for (i, delay) in [100u64, 200, 300, 400].into_iter().enumerate() {
            let channel = channel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                channel.push(i);
            });
        }

        let start = tokio::time::Instant::now();
        let mut stream = channel.stream();
        for expected in 0..4 {
            assert_eq!(stream.next().await, Some(expected));
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(channel.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_recv_does_not_lose_value() {
        let channel = Arc::new(Channel::new());
        let waiting = tokio::time::timeout(Duration::from_millis(10), channel.recv()).await;
        assert!(waiting.is_err());

        channel.push(7);
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.recv().await, 7);
    }
}
