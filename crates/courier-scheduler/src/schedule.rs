//! Due-time schedule: holds requested items until their date has passed.
//!
//! ## Policy
//! Entries drain strictly in arrival order. The head entry is waited on even
//! if an entry added later is due sooner; nothing is re-sorted by date.
//!
//! ## Wake-ups
//! Every `add` swaps in a fresh [`CancelToken`] and fires the old one, so
//! whatever wait is in progress re-evaluates immediately:
//! - waiting on an empty queue → picks up the new entry;
//! - waiting on a head entry that is not yet due → re-arms for the time
//!   remaining (the head is never released early).
//!
//! Released entries are gone: a negative feedback is logged, never requeued.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use courier_core::traits::{Schedule, ScheduleCursor};
use courier_core::types::{Payload, Requested};

use crate::timer::{self, CancelToken, WaitOutcome};

struct PendingEntry<S> {
    payload: S,
    due_at: DateTime<Utc>,
}

struct State<S> {
    pending: VecDeque<PendingEntry<S>>,
    token: CancelToken,
}

/// Default [`Schedule`]: consumes [`Requested<S>`], releases `S` once due.
///
/// Clones share the same pending entries.
pub struct DueTimeSchedule<S> {
    state: Arc<Mutex<State<S>>>,
}

impl<S> Clone for DueTimeSchedule<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: Payload> DueTimeSchedule<S> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                pending: VecDeque::new(),
                token: CancelToken::new(),
            })),
        }
    }

    /// Number of entries waiting to be released.
    pub fn len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Payload> Default for DueTimeSchedule<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<S>(state: &Mutex<State<S>>) -> MutexGuard<'_, State<S>> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: Payload> Schedule<Requested<S>, S> for DueTimeSchedule<S> {
    fn add(&self, requested: Requested<S>) {
        tracing::debug!("📅 [schedule] Adding {:?} due {}", requested.data, requested.date);
        let previous = {
            let mut state = lock(&self.state);
            state.pending.push_back(PendingEntry {
                payload: requested.data,
                due_at: requested.date,
            });
            std::mem::replace(&mut state.token, CancelToken::new())
        };
        previous.cancel();
    }

    fn run(&self) -> Box<dyn ScheduleCursor<S>> {
        Box::new(DueTimeCursor {
            state: Arc::clone(&self.state),
            in_flight: None,
        })
    }
}

/// Consumption cursor of a [`DueTimeSchedule`].
struct DueTimeCursor<S> {
    state: Arc<Mutex<State<S>>>,
    in_flight: Option<S>,
}

impl<S: Payload> DueTimeCursor<S> {
    fn current_token(&self) -> CancelToken {
        lock(&self.state).token.clone()
    }
}

/// Time left until `due_at`, zero when already due.
fn remaining(due_at: DateTime<Utc>) -> Duration {
    (due_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

#[async_trait]
impl<S: Payload> ScheduleCursor<S> for DueTimeCursor<S> {
    async fn next(&mut self) -> Option<S> {
        if let Some(unanswered) = self.in_flight.take() {
            tracing::warn!("⚠️ [schedule] No feedback received for {:?}", unanswered);
        }

        loop {
            // Pop and capture the token under one lock: an `add` landing
            // between the two would otherwise leave us waiting on a token
            // nobody fires.
            let (head, token) = {
                let mut state = lock(&self.state);
                (state.pending.pop_front(), state.token.clone())
            };

            let Some(entry) = head else {
                tracing::debug!("💤 [schedule] Waiting for new entries");
                timer::wait(None, &token).await;
                continue;
            };

            let mut token = token;
            loop {
                let left = remaining(entry.due_at);
                if left.is_zero() {
                    break;
                }
                tracing::debug!("⏳ [schedule] Waiting for {}", entry.due_at);
                match timer::wait(Some(left), &token).await {
                    WaitOutcome::Elapsed => break,
                    WaitOutcome::Cancelled => token = self.current_token(),
                }
            }

            self.in_flight = Some(entry.payload.clone());
            return Some(entry.payload);
        }
    }

    fn feedback(&mut self, accepted: bool) {
        match self.in_flight.take() {
            Some(payload) if !accepted => {
                tracing::warn!("⚠️ [schedule] Data were not accepted: {:?}", payload);
            }
            Some(_) => {}
            None => tracing::debug!("[schedule] Feedback without a released item ignored"),
        }
    }
}
