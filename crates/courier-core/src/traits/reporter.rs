//! Reporter trait: observability hooks called by the engine.

use crate::types::Payload;

/// Hook set invoked around every released item. Only `log` is required.
///
/// Hooks run inline on the consumption loop; a panicking hook is caught and
/// logged by the engine.
pub trait Reporter<S: Payload>: Send + Sync {
    fn log(&self, message: &str);

    /// Item released by the schedule, before content resolution.
    fn on_scheduled(&self, _scheduled: &S) {}

    /// Right before the notifier is called.
    fn on_delivery_start(&self, _scheduled: &S) {}

    /// Right after the notifier returned successfully.
    fn on_delivery_end(&self, _scheduled: &S) {}
}

/// Default reporter: `log` goes to `tracing`, hooks are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl<S: Payload> Reporter<S> for TracingReporter {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }
}
