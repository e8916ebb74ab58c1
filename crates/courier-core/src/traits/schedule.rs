//! Schedule trait: the holding area between producers and delivery.

use async_trait::async_trait;

use crate::types::Payload;

/// Accepts requested items and releases scheduled items when they are due.
pub trait Schedule<R: Payload, S: Payload>: Send + Sync {
    /// Hand a requested item over. Never blocks.
    fn add(&self, requested: R);

    /// Open the consumption cursor. The engine opens exactly one.
    fn run(&self) -> Box<dyn ScheduleCursor<S>>;
}

/// Consumption side of a [`Schedule`]: released items go out through
/// [`next`](ScheduleCursor::next), the outcome of each comes back through
/// [`feedback`](ScheduleCursor::feedback) before the next call.
#[async_trait]
pub trait ScheduleCursor<S: Payload>: Send {
    /// Wait for the next due item. `None` means the schedule is finished.
    async fn next(&mut self) -> Option<S>;

    /// Whether the item last returned by `next` was resolved and delivered.
    fn feedback(&mut self, accepted: bool);
}
