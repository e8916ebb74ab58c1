//! # Courier Channels
//! Ready-made producers, content sources, and notifiers.
//!
//! - Producers: [`PeriodicProducer`] (cron or interval), [`WebhookProducer`] (HTTP)
//! - Content: [`TemplateSource`], [`FileSource`], [`FetchSource`]
//! - Notifiers: [`LogNotifier`], [`WebhookNotifier`]

pub mod content;
pub mod cron;
pub mod notify;
pub mod periodic;
pub mod webhook;

pub use content::{FetchSource, FileSource, TemplateSource};
pub use cron::CronSchedule;
pub use notify::{DeliveryRecord, LogNotifier, WebhookNotifier};
pub use periodic::{PeriodicProducer, Trigger};
pub use webhook::WebhookProducer;
