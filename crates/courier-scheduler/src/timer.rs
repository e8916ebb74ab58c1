//! Interruptible sleep.
//!
//! [`wait`] sleeps for an optional duration and returns early when its
//! [`CancelToken`] fires. Cancellation is an ordinary outcome, not an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// One-shot broadcast cancellation signal. Once fired it stays fired;
/// every current and future waiter observes it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    fired: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token, waking every waiter.
    pub fn cancel(&self) {
        self.inner.fired.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the token has fired.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent `cancel` is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// How a [`wait`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Sleep for `duration` (forever when `None`) or until `cancel` fires,
/// whichever comes first. The losing branch, including its timer, is
/// dropped before returning.
pub async fn wait(duration: Option<Duration>, cancel: &CancelToken) -> WaitOutcome {
    match duration {
        Some(duration) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => WaitOutcome::Cancelled,
                _ = tokio::time::sleep(duration) => WaitOutcome::Elapsed,
            }
        }
        None => {
            cancel.cancelled().await;
            WaitOutcome::Cancelled
        }
    }
}
