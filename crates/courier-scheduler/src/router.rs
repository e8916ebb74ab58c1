//! Delivery router: picks a content source and a notifier for each
//! released item and runs them.
//!
//! Selection is first-match in registration order; a source or notifier
//! without an `accepts` override matches everything. Failures of any kind
//! (no match, `Err`, panic) end up as a non-delivered [`Delivery`], never as
//! an error escaping to the consumption loop.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use courier_core::error::Result;
use courier_core::traits::{ContentSource, Notifier, Reporter};
use courier_core::types::Payload;

/// Which selection step found no taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Content,
    Notifier,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Content => write!(f, "content source"),
            Stage::Notifier => write!(f, "notifier"),
        }
    }
}

/// Outcome of routing one scheduled item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Nothing accepted the item at this stage.
    Unrouted(Stage),
    /// A source or notifier returned an error or panicked.
    Failed(String),
}

impl Delivery {
    /// The feedback value handed back to the schedule.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

pub struct Router<S: Payload, C: Payload> {
    sources: Vec<Box<dyn ContentSource<S, C>>>,
    notifiers: Vec<Box<dyn Notifier<S, C>>>,
    reporter: Arc<dyn Reporter<S>>,
}

impl<S: Payload, C: Payload> Router<S, C> {
    pub fn new(
        sources: Vec<Box<dyn ContentSource<S, C>>>,
        notifiers: Vec<Box<dyn Notifier<S, C>>>,
        reporter: Arc<dyn Reporter<S>>,
    ) -> Self {
        Self {
            sources,
            notifiers,
            reporter,
        }
    }

    /// Route `scheduled` end to end. Hooks fire on release, right before
    /// the notifier is called, and right after it returns.
    pub async fn process(&self, scheduled: &S) -> Delivery {
        hook("on_scheduled", || self.reporter.on_scheduled(scheduled));

        match AssertUnwindSafe(self.route(scheduled)).catch_unwind().await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(e)) => {
                tracing::warn!("❌ Delivery failed for {:?}: {e}", scheduled);
                Delivery::Failed(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!("💥 Delivery panicked for {:?}: {reason}", scheduled);
                Delivery::Failed(reason)
            }
        }
    }

    async fn route(&self, scheduled: &S) -> Result<Delivery> {
        let Some(source) = self.sources.iter().find(|s| s.accepts(scheduled)) else {
            return Ok(self.unrouted(scheduled, Stage::Content));
        };
        let content = source.get_content(scheduled).await?;

        let Some(notifier) = self.notifiers.iter().find(|n| n.accepts(scheduled, &content)) else {
            return Ok(self.unrouted(scheduled, Stage::Notifier));
        };

        hook("on_delivery_start", || self.reporter.on_delivery_start(scheduled));
        notifier.notify(scheduled, &content).await?;
        hook("on_delivery_end", || self.reporter.on_delivery_end(scheduled));

        Ok(Delivery::Delivered)
    }

    fn unrouted(&self, scheduled: &S, stage: Stage) -> Delivery {
        self.reporter
            .log(&format!("🚫 No {stage} accepted {scheduled:?}"));
        Delivery::Unrouted(stage)
    }
}

/// Run a reporter hook, swallowing panics.
fn hook(name: &str, f: impl FnOnce()) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::warn!("⚠️ Reporter hook {name} panicked: {}", panic_message(panic.as_ref()));
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::error::CourierError;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Source {
        name: &'static str,
        accept: bool,
        fail: bool,
        log: Log,
    }

    #[async_trait]
    impl ContentSource<String, String> for Source {
        async fn get_content(&self, scheduled: &String) -> Result<String> {
            self.log.lock().unwrap().push(format!("{}:content", self.name));
            if self.fail {
                return Err(CourierError::content("upstream down"));
            }
            Ok(format!("{} for {scheduled}", self.name))
        }

        fn accepts(&self, _scheduled: &String) -> bool {
            self.accept
        }
    }

    struct Sink {
        name: &'static str,
        accept: bool,
        panic: bool,
        log: Log,
    }

    #[async_trait]
    impl Notifier<String, String> for Sink {
        async fn notify(&self, _scheduled: &String, content: &String) -> Result<()> {
            if self.panic {
                panic!("sink exploded");
            }
            self.log.lock().unwrap().push(format!("{}:{content}", self.name));
            Ok(())
        }

        fn accepts(&self, _scheduled: &String, _content: &String) -> bool {
            self.accept
        }
    }

    /// Accepts everything through the trait defaults.
    struct Permissive(Log);

    #[async_trait]
    impl ContentSource<String, String> for Permissive {
        async fn get_content(&self, _scheduled: &String) -> Result<String> {
            Ok("default".into())
        }
    }

    #[async_trait]
    impl Notifier<String, String> for Permissive {
        async fn notify(&self, _scheduled: &String, content: &String) -> Result<()> {
            self.0.lock().unwrap().push(format!("permissive:{content}"));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Hooks {
        events: Mutex<Vec<String>>,
        panic_on_scheduled: bool,
    }

    impl Reporter<String> for Hooks {
        fn log(&self, message: &str) {
            self.events.lock().unwrap().push(format!("log:{message}"));
        }
        fn on_scheduled(&self, s: &String) {
            if self.panic_on_scheduled {
                panic!("hook bug");
            }
            self.events.lock().unwrap().push(format!("scheduled:{s}"));
        }
        fn on_delivery_start(&self, s: &String) {
            self.events.lock().unwrap().push(format!("start:{s}"));
        }
        fn on_delivery_end(&self, s: &String) {
            self.events.lock().unwrap().push(format!("end:{s}"));
        }
    }

    fn source(name: &'static str, accept: bool, log: &Log) -> Box<dyn ContentSource<String, String>> {
        Box::new(Source { name, accept, fail: false, log: log.clone() })
    }

    fn sink(name: &'static str, accept: bool, log: &Log) -> Box<dyn Notifier<String, String>> {
        Box::new(Sink { name, accept, panic: false, log: log.clone() })
    }

    #[tokio::test]
    async fn test_first_accepting_source_and_sink_win() {
        let log = Log::default();
        let hooks = Arc::new(Hooks::default());
        let router = Router::new(
            vec![source("R1", false, &log), source("R2", true, &log)],
            vec![sink("S1", false, &log), sink("S2", true, &log)],
            hooks.clone(),
        );

        let outcome = router.process(&"alice".to_string()).await;
        assert_eq!(outcome, Delivery::Delivered);
        assert!(outcome.is_delivered());
        assert_eq!(*log.lock().unwrap(), vec!["R2:content", "S2:R2 for alice"]);
        assert_eq!(
            *hooks.events.lock().unwrap(),
            vec!["scheduled:alice", "start:alice", "end:alice"]
        );
    }

    #[tokio::test]
    async fn test_missing_accepts_means_accept_all() {
        let log = Log::default();
        let router = Router::new(
            vec![Box::new(Permissive(log.clone())) as Box<dyn ContentSource<String, String>>],
            vec![Box::new(Permissive(log.clone())) as Box<dyn Notifier<String, String>>],
            Arc::new(Hooks::default()),
        );
        assert!(router.process(&"x".to_string()).await.is_delivered());
        assert_eq!(*log.lock().unwrap(), vec!["permissive:default"]);
    }

    #[tokio::test]
    async fn test_no_accepting_source_is_unrouted() {
        let log = Log::default();
        let hooks = Arc::new(Hooks::default());
        let router = Router::new(
            vec![source("R1", false, &log)],
            vec![sink("S1", true, &log)],
            hooks.clone(),
        );

        let outcome = router.process(&"bob".to_string()).await;
        assert_eq!(outcome, Delivery::Unrouted(Stage::Content));
        assert!(!outcome.is_delivered());
        assert!(log.lock().unwrap().is_empty());
        let events = hooks.events.lock().unwrap();
        assert_eq!(events[0], "scheduled:bob");
        assert!(events[1].starts_with("log:🚫 No content source accepted"));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_no_accepting_notifier_is_unrouted() {
        let log = Log::default();
        let router = Router::new(
            vec![source("R1", true, &log)],
            vec![sink("S1", false, &log)],
            Arc::new(Hooks::default()),
        );
        let outcome = router.process(&"bob".to_string()).await;
        assert_eq!(outcome, Delivery::Unrouted(Stage::Notifier));
        assert_eq!(*log.lock().unwrap(), vec!["R1:content"]);
    }

    #[tokio::test]
    async fn test_source_error_becomes_failed_delivery() {
        let log = Log::default();
        let router = Router::new(
            vec![Box::new(Source { name: "R1", accept: true, fail: true, log: log.clone() })
                as Box<dyn ContentSource<String, String>>],
            vec![sink("S1", true, &log)],
            Arc::new(Hooks::default()),
        );
        match router.process(&"carol".to_string()).await {
            Delivery::Failed(reason) => assert!(reason.contains("upstream down")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["R1:content"]);
    }

    #[tokio::test]
    async fn test_notifier_panic_is_contained() {
        let log = Log::default();
        let hooks = Arc::new(Hooks::default());
        let router = Router::new(
            vec![source("R1", true, &log)],
            vec![Box::new(Sink { name: "S1", accept: true, panic: true, log: log.clone() })
                as Box<dyn Notifier<String, String>>],
            hooks.clone(),
        );
        match router.process(&"dave".to_string()).await {
            Delivery::Failed(reason) => assert_eq!(reason, "sink exploded"),
            other => panic!("expected failure, got {other:?}"),
        }
        let events = hooks.events.lock().unwrap();
        assert!(events.contains(&"start:dave".to_string()));
        assert!(!events.contains(&"end:dave".to_string()));
    }

    #[tokio::test]
    async fn test_hook_panic_does_not_abort_delivery() {
        let log = Log::default();
        let hooks = Arc::new(Hooks { panic_on_scheduled: true, ..Default::default() });
        let router = Router::new(
            vec![source("R1", true, &log)],
            vec![sink("S1", true, &log)],
            hooks,
        );
        assert!(router.process(&"erin".to_string()).await.is_delivered());
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
