//! Fluent wiring for [`Engine`].

use std::sync::Arc;

use courier_core::error::{CourierError, Result};
use courier_core::traits::{
    ContentSource, Notifier, Producer, Reporter, Schedule, TracingReporter,
};
use courier_core::types::{Payload, Requested};

use crate::engine::Engine;
use crate::router::Router;
use crate::schedule::DueTimeSchedule;

/// Collects the parts of an [`Engine`]. Order of registration is the
/// selection order for content sources and notifiers.
pub struct EngineBuilder<R: Payload, S: Payload, C: Payload> {
    producers: Vec<Box<dyn Producer<R>>>,
    schedule: Option<Arc<dyn Schedule<R, S>>>,
    sources: Vec<Box<dyn ContentSource<S, C>>>,
    notifiers: Vec<Box<dyn Notifier<S, C>>>,
    reporter: Option<Arc<dyn Reporter<S>>>,
}

impl<R: Payload, S: Payload, C: Payload> EngineBuilder<R, S, C> {
    pub fn new() -> Self {
        Self {
            producers: Vec::new(),
            schedule: None,
            sources: Vec::new(),
            notifiers: Vec::new(),
            reporter: None,
        }
    }

    pub fn producer(mut self, producer: impl Producer<R> + 'static) -> Self {
        self.producers.push(Box::new(producer));
        self
    }

    pub fn producers(mut self, producers: impl IntoIterator<Item = Box<dyn Producer<R>>>) -> Self {
        self.producers.extend(producers);
        self
    }

    pub fn schedule(mut self, schedule: impl Schedule<R, S> + 'static) -> Self {
        self.schedule = Some(Arc::new(schedule));
        self
    }

    pub fn content_source(mut self, source: impl ContentSource<S, C> + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn content_sources(
        mut self,
        sources: impl IntoIterator<Item = Box<dyn ContentSource<S, C>>>,
    ) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier<S, C> + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }

    pub fn notifiers(mut self, notifiers: impl IntoIterator<Item = Box<dyn Notifier<S, C>>>) -> Self {
        self.notifiers.extend(notifiers);
        self
    }

    /// Replace the default [`TracingReporter`].
    pub fn reporter(mut self, reporter: Arc<dyn Reporter<S>>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<Engine<R, S, C>> {
        if self.producers.is_empty() {
            return Err(CourierError::config("no producers: add at least one producer"));
        }
        let Some(schedule) = self.schedule else {
            return Err(CourierError::config("no schedule: call `schedule(...)`"));
        };
        if self.sources.is_empty() {
            return Err(CourierError::config(
                "no content sources: add at least one content source",
            ));
        }
        if self.notifiers.is_empty() {
            return Err(CourierError::config("no notifiers: add at least one notifier"));
        }

        let reporter = self
            .reporter
            .unwrap_or_else(|| Arc::new(TracingReporter));
        let router = Router::new(self.sources, self.notifiers, Arc::clone(&reporter));
        Ok(Engine::from_parts(self.producers, schedule, router, reporter))
    }
}

impl<S: Payload, C: Payload> EngineBuilder<Requested<S>, S, C> {
    /// Use the built-in [`DueTimeSchedule`].
    pub fn due_time_schedule(self) -> Self {
        self.schedule(DueTimeSchedule::new())
    }
}

impl<R: Payload, S: Payload, C: Payload> Default for EngineBuilder<R, S, C> {
    fn default() -> Self {
        Self::new()
    }
}
