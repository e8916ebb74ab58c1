//! # Courier Scheduler
//!
//! The engine that moves requested items from producers, through a
//! schedule, to content sources and notifiers.
//!
//! ## Architecture
//! ```text
//! Producer A ─┐
//! Producer B ─┼─→ Schedule.add ─→ (due) ─→ Router ─→ ContentSource ─→ Notifier
//! Producer C ─┘        ↑                     │
//!                      └──── feedback ←──────┘
//! ```
//!
//! - Producers run concurrently; a failing one ends alone.
//! - The schedule releases one item at a time and waits for its feedback.
//! - Routing is first-match in registration order.
//! - [`Reporter`](courier_core::traits::Reporter) hooks observe every step.

pub mod analytics;
pub mod builder;
pub mod channel;
pub mod engine;
pub mod router;
pub mod schedule;
pub mod timer;

pub use analytics::{Analytics, Metrics, Record, Summary};
pub use builder::EngineBuilder;
pub use channel::Channel;
pub use engine::Engine;
pub use router::{Delivery, Router, Stage};
pub use schedule::DueTimeSchedule;
pub use timer::{CancelToken, WaitOutcome, wait};
