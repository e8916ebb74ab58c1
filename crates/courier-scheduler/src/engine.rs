//! Engine: the main loop tying producers, schedule, and delivery together.
//!
//! Every producer runs as its own task feeding [`Schedule::add`]. A single
//! consumption task drains the schedule, routes each released item through
//! the [`Router`], and feeds the outcome back before asking for the next
//! one. One item is in flight at a time. A producer that errors or panics
//! stops on its own; the rest of the engine keeps going.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use courier_core::error::Result;
use courier_core::traits::{Producer, Reporter, Schedule};
use courier_core::types::Payload;

use crate::builder::EngineBuilder;
use crate::router::{Router, panic_message};

/// The scheduling and delivery engine.
///
/// - `R`: what producers emit and the schedule accepts
/// - `S`: what the schedule releases
/// - `C`: what content sources produce and notifiers deliver
pub struct Engine<R: Payload, S: Payload, C: Payload> {
    producers: Vec<Box<dyn Producer<R>>>,
    schedule: Arc<dyn Schedule<R, S>>,
    router: Router<S, C>,
    reporter: Arc<dyn Reporter<S>>,
}

impl<R: Payload, S: Payload, C: Payload> Engine<R, S, C> {
    /// Entry point for wiring an engine.
    pub fn builder() -> EngineBuilder<R, S, C> {
        EngineBuilder::new()
    }

    pub(crate) fn from_parts(
        producers: Vec<Box<dyn Producer<R>>>,
        schedule: Arc<dyn Schedule<R, S>>,
        router: Router<S, C>,
        reporter: Arc<dyn Reporter<S>>,
    ) -> Self {
        Self {
            producers,
            schedule,
            router,
            reporter,
        }
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    /// Run all producers and the consumption loop concurrently. Returns once
    /// every one of them has finished, which for long-lived producers is
    /// never.
    pub async fn run(&self) {
        self.reporter
            .log(&format!("🚀 Starting engine ({} producers)", self.producers.len()));

        let producers = join_all(self.producers.iter().map(|p| self.guarded_producer_job(p.as_ref())));
        tokio::join!(producers, self.schedule_job());
    }

    /// Like [`run`](Self::run), but each producer is moved onto its own OS
    /// thread with a private single-threaded runtime. Emitted values come
    /// back over a channel; nothing else is shared.
    ///
    /// Producers must not rely on the caller's runtime (spawned tasks,
    /// handles, task-locals): those are not available on the worker thread.
    pub async fn run_isolated(mut self) -> Result<()> {
        let producers = std::mem::take(&mut self.producers);
        self.reporter.log(&format!(
            "🚀 Starting engine ({} isolated producers)",
            producers.len()
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        for producer in producers {
            let tx = tx.clone();
            std::thread::Builder::new()
                .name(format!("courier-producer-{}", producer.name()))
                .spawn(move || isolated_worker(producer, tx))?;
        }
        drop(tx);

        let forward = async {
            let mut emitted = UnboundedReceiverStream::new(rx);
            while let Some(requested) = emitted.next().await {
                self.schedule.add(requested);
            }
            self.reporter.log("All isolated producers ended");
        };
        tokio::join!(forward, self.schedule_job());
        Ok(())
    }

    async fn guarded_producer_job(&self, producer: &dyn Producer<R>) {
        if let Err(panic) = AssertUnwindSafe(self.producer_job(producer)).catch_unwind().await {
            tracing::error!(
                "💥 Producer '{}' panicked: {}",
                producer.name(),
                panic_message(panic.as_ref())
            );
        }
    }

    async fn producer_job(&self, producer: &dyn Producer<R>) {
        let name = producer.name();
        let mut stream = match producer.run().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("❌ Producer '{name}' failed to start: {e}");
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(requested) => self.schedule.add(requested),
                Err(e) => {
                    tracing::error!("❌ Producer '{name}' failed: {e}");
                    return;
                }
            }
        }
        self.reporter.log(&format!("Producer '{name}' ended"));
    }

    async fn schedule_job(&self) {
        let mut cursor = self.schedule.run();
        while let Some(scheduled) = cursor.next().await {
            let delivery = self.router.process(&scheduled).await;
            tracing::debug!("📬 {:?} → {:?}", scheduled, delivery);
            cursor.feedback(delivery.is_delivered());
        }
        self.reporter.log("Schedule ended");
    }
}

fn isolated_worker<R: Payload>(producer: Box<dyn Producer<R>>, tx: mpsc::UnboundedSender<R>) {
    let name = producer.name().to_string();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("❌ Producer '{name}': worker runtime failed: {e}");
            return;
        }
    };

    runtime.block_on(async move {
        let mut stream = match producer.run().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("❌ Producer '{name}' failed to start: {e}");
                return;
            }
        };
        while let Some(item) = stream.next().await {
            match item {
                Ok(requested) => {
                    if tx.send(requested).is_err() {
                        tracing::debug!("Producer '{name}' stopped (engine gone)");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!("❌ Producer '{name}' failed: {e}");
                    return;
                }
            }
        }
        tracing::info!("Producer '{name}' ended");
    });
}
