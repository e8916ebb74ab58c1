//! Plug points of the pipeline. Concrete implementations live in
//! `courier-scheduler` (the default schedule) and `courier-channels`.

pub mod content;
pub mod notifier;
pub mod producer;
pub mod reporter;
pub mod schedule;

pub use content::ContentSource;
pub use notifier::Notifier;
pub use producer::{Producer, RequestStream};
pub use reporter::{Reporter, TracingReporter};
pub use schedule::{Schedule, ScheduleCursor};
