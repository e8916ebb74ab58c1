//! Producer trait: a source of requested items.

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::types::Payload;

/// Stream handed out by [`Producer::run`]. An `Err` item ends the producer.
pub type RequestStream<R> = Box<dyn Stream<Item = Result<R>> + Send + Unpin>;

/// Emits requested items over time (cron ticks, inbound webhooks, bus
/// messages, ...). The stream may be infinite and may stay silent for as
/// long as it likes.
#[async_trait]
pub trait Producer<R: Payload>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Start producing. Called once per engine run.
    async fn run(&self) -> Result<RequestStream<R>>;
}
