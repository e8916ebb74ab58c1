//! Periodic producer: calls an async callback on every tick of a cron
//! expression or a fixed interval and emits whatever it returns.
//!
//! The tick loop runs as a background task that pushes into a [`Channel`];
//! it stops on its own once the stream handed out by `run` is dropped.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio::sync::Notify;

use courier_core::error::{CourierError, Result};
use courier_core::traits::{Producer, RequestStream};
use courier_core::types::{Payload, Recipient, Requested};
use courier_scheduler::Channel;

use crate::cron::CronSchedule;

/// When a [`PeriodicProducer`] fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Cron(CronSchedule),
    Every(Duration),
}

impl Trigger {
    /// Parse a cron expression into a trigger.
    pub fn cron(expression: &str) -> Result<Self> {
        Ok(Self::Cron(CronSchedule::parse(expression)?))
    }

    pub fn every(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CourierError::config("interval must be greater than 0"));
        }
        Ok(Self::Every(interval))
    }

    /// First tick strictly after `after`, `None` when it will never fire again.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Every(interval) => Some(after + chrono::Duration::from_std(*interval).ok()?),
            Trigger::Cron(cron) => cron.next_after(after),
        }
    }

    /// Time until the next tick, `None` when it will never fire again.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let at = self.next_fire(now)?;
        Some((at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Cron(cron) => write!(f, "cron '{cron}'"),
            Trigger::Every(interval) => write!(f, "every {}s", interval.as_secs_f64()),
        }
    }
}

type Callback<R> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<R>>> + Send + Sync>;

struct Shared {
    trigger: Mutex<Trigger>,
    changed: Notify,
}

impl Shared {
    fn trigger(&self) -> MutexGuard<'_, Trigger> {
        self.trigger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct PeriodicProducer<R: Payload> {
    name: String,
    shared: Arc<Shared>,
    callback: Callback<R>,
}

impl<R: Payload> PeriodicProducer<R> {
    /// `callback` runs on every tick; each returned item is emitted in order.
    /// A failing callback is logged and the next tick proceeds normally.
    pub fn new<F, Fut>(trigger: Trigger, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<R>>> + Send + 'static,
    {
        Self {
            name: "periodic".into(),
            shared: Arc::new(Shared {
                trigger: Mutex::new(trigger),
                changed: Notify::new(),
            }),
            callback: Arc::new(move || callback().boxed()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn trigger(&self) -> Trigger {
        self.shared.trigger().clone()
    }

    /// Replace the trigger. A running tick loop re-arms immediately.
    pub fn set_trigger(&self, trigger: Trigger) {
        tracing::info!("🔁 [{}] Trigger set to {trigger}", self.name);
        *self.shared.trigger() = trigger;
        self.shared.changed.notify_one();
    }
}

impl PeriodicProducer<Requested<Recipient>> {
    /// One request per recipient on every tick, due `delay` after the tick.
    pub fn recipients(trigger: Trigger, recipients: Vec<Recipient>, delay: Duration) -> Self {
        let recipients = Arc::new(recipients);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        Self::new(trigger, move || {
            let recipients = Arc::clone(&recipients);
            async move {
                Ok(recipients
                    .iter()
                    .map(|r| Requested::after(r.clone(), delay))
                    .collect())
            }
        })
    }
}

#[async_trait]
impl<R: Payload> Producer<R> for PeriodicProducer<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<RequestStream<R>> {
        let channel = Arc::new(Channel::new());
        tracing::info!("⏰ [{}] Started, {}", self.name, self.trigger());
        tokio::spawn(tick_loop(
            self.name.clone(),
            Arc::clone(&self.shared),
            Arc::clone(&self.callback),
            Arc::downgrade(&channel),
        ));
        Ok(Box::new(channel.stream().map(Ok::<R, CourierError>)))
    }
}

/// Next tick and the wait until it. Cron ticks count from the previous
/// tick's scheduled instant so a wall clock that trails the timer cannot
/// fire the same minute twice. Intervals are relative to the timer only.
fn plan_tick(
    trigger: &Trigger,
    last_fire: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, Duration)> {
    let from = match trigger {
        Trigger::Cron(_) => last_fire.map_or(now, |last| last.max(now)),
        Trigger::Every(_) => now,
    };
    let at = trigger.next_fire(from)?;
    Some((at, (at - now).to_std().unwrap_or(Duration::ZERO)))
}

async fn tick_loop<R: Payload>(
    name: String,
    shared: Arc<Shared>,
    callback: Callback<R>,
    channel: Weak<Channel<R>>,
) {
    let mut last_fire = None;
    loop {
        let plan = plan_tick(&shared.trigger(), last_fire, Utc::now());
        let fired = match plan {
            Some((at, delay)) => tokio::select! {
                _ = tokio::time::sleep(delay) => Some(at),
                _ = shared.changed.notified() => None,
            },
            None => {
                tracing::warn!("⚠️ [{name}] Trigger never fires again, waiting for a new one");
                shared.changed.notified().await;
                None
            }
        };
        let Some(at) = fired else {
            last_fire = None;
            continue;
        };
        last_fire = Some(at);

        let items = match callback().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("❌ [{name}] Tick callback failed: {e}");
                continue;
            }
        };
        let Some(channel) = channel.upgrade() else {
            tracing::debug!("[{name}] Stream dropped, stopping");
            return;
        };
        tracing::debug!("⏰ [{name}] Tick emitted {} items", items.len());
        for item in items {
            channel.push(item);
        }
    }
}
