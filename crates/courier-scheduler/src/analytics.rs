//! Analytics: a [`Reporter`] that timestamps each item's journey through
//! the pipeline and summarises notification and interaction latency.
//!
//! Items are matched by equality against the most recent record. Setting a
//! metric that record already has opens a new record, so an item released
//! twice shows up twice.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use courier_core::traits::Reporter;
use courier_core::types::Payload;

/// Timestamps collected for one release of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notify_start: Option<DateTime<Utc>>,
    pub notify_end: Option<DateTime<Utc>>,
    pub interacted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum Metric {
    Scheduled,
    NotifyStart,
    NotifyEnd,
    Interacted,
}

impl Metrics {
    fn slot(&mut self, metric: Metric) -> &mut Option<DateTime<Utc>> {
        match metric {
            Metric::Scheduled => &mut self.scheduled_at,
            Metric::NotifyStart => &mut self.notify_start,
            Metric::NotifyEnd => &mut self.notify_end,
            Metric::Interacted => &mut self.interacted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Record<S> {
    pub scheduled: S,
    pub metrics: Metrics,
}

/// Aggregates over all records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Mean notifier duration in seconds.
    pub average_notification_secs: f64,
    /// Mean time from delivery to interaction in seconds.
    pub average_interaction_secs: f64,
    /// Share of notified records that saw an interaction, rounded.
    pub percent_interacted: u32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg notification {:.2}s, avg interaction {:.2}s, {}% interacted",
            self.average_notification_secs, self.average_interaction_secs, self.percent_interacted
        )
    }
}

pub struct Analytics<S> {
    records: Mutex<Vec<Record<S>>>,
}

impl<S: Payload + PartialEq> Analytics<S> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record<S>>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add_metric(&self, scheduled: &S, metric: Metric) {
        let now = Utc::now();
        let mut records = self.lock();
        if let Some(record) = records.iter_mut().rev().find(|r| &r.scheduled == scheduled) {
            let slot = record.metrics.slot(metric);
            if slot.is_none() {
                *slot = Some(now);
                return;
            }
        }
        let mut metrics = Metrics::default();
        *metrics.slot(metric) = Some(now);
        records.push(Record {
            scheduled: scheduled.clone(),
            metrics,
        });
    }

    /// Record that the recipient interacted with a delivered item
    /// (clicked, replied, opened...).
    pub fn report_interaction(&self, scheduled: &S) {
        self.add_metric(scheduled, Metric::Interacted);
    }

    /// Snapshot of the raw records.
    pub fn records(&self) -> Vec<Record<S>> {
        self.lock().clone()
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.lock())
    }
}

impl<S: Payload + PartialEq> Default for Analytics<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize<S>(records: &[Record<S>]) -> Summary {
    let notified = records
        .iter()
        .filter(|r| r.metrics.notify_start.is_some() || r.metrics.notify_end.is_some())
        .count();
    let interacted = records
        .iter()
        .filter(|r| r.metrics.interacted_at.is_some())
        .count();

    let notification_ms: i64 = records
        .iter()
        .filter_map(|r| Some((r.metrics.notify_end? - r.metrics.notify_start?).num_milliseconds()))
        .sum();
    let interaction_ms: i64 = records
        .iter()
        .filter_map(|r| Some((r.metrics.interacted_at? - r.metrics.notify_end?).num_milliseconds()))
        .sum();

    let average_secs = |total_ms: i64, count: usize| {
        if count == 0 {
            0.0
        } else {
            total_ms as f64 / count as f64 / 1000.0
        }
    };
    let percent_interacted = if notified == 0 {
        0
    } else {
        (interacted as f64 / notified as f64 * 100.0).round() as u32
    };

    Summary {
        average_notification_secs: average_secs(notification_ms, notified),
        average_interaction_secs: average_secs(interaction_ms, interacted),
        percent_interacted,
    }
}

impl<S: Payload + PartialEq> Reporter<S> for Analytics<S> {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn on_scheduled(&self, scheduled: &S) {
        self.add_metric(scheduled, Metric::Scheduled);
    }

    fn on_delivery_start(&self, scheduled: &S) {
        self.add_metric(scheduled, Metric::NotifyStart);
    }

    fn on_delivery_end(&self, scheduled: &S) {
        self.add_metric(scheduled, Metric::NotifyEnd);
    }
}
