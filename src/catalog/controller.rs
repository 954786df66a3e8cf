// src/catalog/controller.rs
//! Scroll-triggered fetching.
//!
//! A sentinel sits after the last rendered book. Each time it crosses into
//! full view, the controller asks the cache for the next page, unless the
//! result set is exhausted or a fetch it started is still outstanding.

use super::cache::{FetchOutcome, PaginatedQueryCache};
use crate::api::BookSource;
use crate::constants::FULL_VISIBILITY_THRESHOLD;
use crate::error::AppError;
use crate::types::Query;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// A viewport-intersection report for the sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    /// Fraction of the sentinel inside the viewport, in `0.0..=1.0`.
    pub intersection_ratio: f64,
}

impl Visibility {
    pub fn fully_visible() -> Self {
        Self {
            intersection_ratio: 1.0,
        }
    }

    pub fn hidden() -> Self {
        Self {
            intersection_ratio: 0.0,
        }
    }

    /// Partial visibility does not count.
    pub fn is_fully_visible(&self) -> bool {
        self.intersection_ratio >= FULL_VISIBILITY_THRESHOLD
    }
}

/// Why a visibility event did not start a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotVisible,
    /// The sentinel was already fully visible; only crossings trigger.
    NoCrossing,
    /// The stable query's result set is not active in the cache.
    NotObserved,
    NoMorePages,
    FetchOutstanding,
    TornDown,
}

/// What a visibility event led to.
#[derive(Debug)]
pub enum Trigger {
    Started(JoinHandle<Result<FetchOutcome, AppError>>),
    Ignored(IgnoreReason),
}

impl Trigger {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }

    /// Waits for a started fetch; `None` when the event was ignored.
    pub async fn finish(self) -> Option<Result<FetchOutcome, AppError>> {
        match self {
            Self::Started(handle) => Some(handle.await.map_err(AppError::from).and_then(|r| r)),
            Self::Ignored(_) => None,
        }
    }
}

/// Clears the re-entrancy flag when the fetch it guards ends, however it ends.
struct InFlightGuard(Arc<watch::Sender<bool>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Turns sentinel visibility into `fetch_next_page` calls.
#[derive(Debug)]
pub struct ScrollFetchController<S> {
    cache: PaginatedQueryCache<S>,
    query: watch::Receiver<Query>,
    in_flight: Arc<watch::Sender<bool>>,
    was_visible: AtomicBool,
    torn_down: AtomicBool,
}

impl<S> ScrollFetchController<S>
where
    S: BookSource + 'static,
{
    /// Creates a controller fetching pages of whatever `query` currently holds.
    pub fn new(cache: PaginatedQueryCache<S>, query: watch::Receiver<Query>) -> Self {
        let (in_flight, _) = watch::channel(false);
        Self {
            cache,
            query,
            in_flight: Arc::new(in_flight),
            was_visible: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Handles one visibility report.
    ///
    /// A fetch starts only on a hidden-to-visible crossing, while the result
    /// set has more pages and no fetch started here is outstanding. The
    /// flag is checked and set in one step, so overlapping events cannot
    /// start a second fetch.
    pub fn on_visibility(&self, event: Visibility) -> Trigger {
        if self.torn_down.load(Ordering::Acquire) {
            return Trigger::Ignored(IgnoreReason::TornDown);
        }

        let visible = event.is_fully_visible();
        let was_visible = self.was_visible.swap(visible, Ordering::AcqRel);
        if !visible {
            return Trigger::Ignored(IgnoreReason::NotVisible);
        }
        if was_visible {
            return Trigger::Ignored(IgnoreReason::NoCrossing);
        }

        let query = self.query.borrow().clone();
        match self.cache.snapshot(&query.key()) {
            None => return Trigger::Ignored(IgnoreReason::NotObserved),
            Some(view) if !view.has_more => return Trigger::Ignored(IgnoreReason::NoMorePages),
            Some(_) => {}
        }

        let claimed = self.in_flight.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });
        if !claimed {
            log::debug!("Sentinel visible while a fetch is outstanding; ignored");
            return Trigger::Ignored(IgnoreReason::FetchOutstanding);
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let cache = self.cache.clone();
        Trigger::Started(tokio::spawn(async move {
            let _guard = guard;
            cache.fetch_next_page(&query).await
        }))
    }

    /// Whether a fetch started by this controller is outstanding.
    pub fn is_fetching(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// A receiver tracking the re-entrancy flag.
    pub fn subscribe_in_flight(&self) -> watch::Receiver<bool> {
        self.in_flight.subscribe()
    }

    /// Stops reacting to visibility. A fetch already outstanding runs to
    /// completion but nothing here reacts to it.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            log::debug!("Sentinel observation torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Starts listening to sentinel reports arriving on `events`.
    pub fn observe(self: &Arc<Self>, mut events: mpsc::Receiver<Visibility>) -> Observation<S> {
        let controller = Arc::clone(self);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if controller.is_torn_down() {
                    break;
                }
                if let Trigger::Ignored(reason) = controller.on_visibility(event) {
                    log::trace!("Visibility {:?} ignored: {:?}", event, reason);
                }
            }
        });
        Observation {
            controller: Arc::clone(self),
            listener: Some(listener),
        }
    }
}

/// The observation resource held by a view for as long as it is mounted.
///
/// Tearing it down, explicitly or by dropping it, stops the listener and the
/// controller; no visibility callback runs afterwards.
#[derive(Debug)]
pub struct Observation<S>
where
    S: BookSource + 'static,
{
    controller: Arc<ScrollFetchController<S>>,
    listener: Option<JoinHandle<()>>,
}

impl<S> Observation<S>
where
    S: BookSource + 'static,
{
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.controller.teardown();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<S> Drop for Observation<S>
where
    S: BookSource + 'static,
{
    fn drop(&mut self) {
        self.release();
    }
}
