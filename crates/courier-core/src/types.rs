//! Payload envelopes passed between pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bound shared by every value that travels through the engine
/// (requested items, scheduled items, content).
pub trait Payload: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// A request for `data` to be released no earlier than `date`.
///
/// This is the shape the due-time schedule in `courier-scheduler` consumes.
/// On the wire the date is RFC 3339:
///
/// ```json
/// { "data": { "name": "alice" }, "date": "2026-03-01T08:00:00Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requested<S> {
    pub data: S,
    pub date: DateTime<Utc>,
}

impl<S> Requested<S> {
    pub fn new(data: S, date: DateTime<Utc>) -> Self {
        Self { data, date }
    }

    /// Due immediately.
    pub fn now(data: S) -> Self {
        Self::new(data, Utc::now())
    }

    /// Due `delay` from now.
    pub fn after(data: S, delay: chrono::Duration) -> Self {
        Self::new(data, Utc::now() + delay)
    }
}

/// Someone to deliver to, optionally pinned to a named delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    #[serde(default)]
    pub channel: Option<String>,
}

impl Recipient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: None,
        }
    }

    pub fn on_channel(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: Some(channel.into()),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{}@{}", self.name, channel),
            None => write!(f, "{}", self.name),
        }
    }
}
