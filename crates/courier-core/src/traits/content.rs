//! ContentSource trait: resolves what gets delivered for a scheduled item.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Payload;

#[async_trait]
pub trait ContentSource<S: Payload, C: Payload>: Send + Sync {
    /// Produce the content for `scheduled`.
    async fn get_content(&self, scheduled: &S) -> Result<C>;

    /// Whether this source handles `scheduled`. Accepts everything unless
    /// overridden.
    fn accepts(&self, _scheduled: &S) -> bool {
        true
    }
}
