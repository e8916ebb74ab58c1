//! Notifier trait: delivers content to its destination.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Payload;

#[async_trait]
pub trait Notifier<S: Payload, C: Payload>: Send + Sync {
    /// Deliver `content` for `scheduled`.
    async fn notify(&self, scheduled: &S, content: &C) -> Result<()>;

    /// Whether this notifier handles the pair. Accepts everything unless
    /// overridden.
    fn accepts(&self, _scheduled: &S, _content: &C) -> bool {
        true
    }
}
