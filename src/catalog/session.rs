// src/catalog/session.rs
//! Composition root of the catalog core.
//!
//! A [`CatalogSession`] owns the debouncer that stabilizes filter edits, the
//! page cache, and the scroll controller, and gives them one lifecycle:
//! created together, torn down together.

use super::cache::{CacheOptions, FetchOutcome, PaginatedQueryCache};
use super::controller::{Observation, ScrollFetchController, Trigger, Visibility};
use super::view::CatalogView;
use crate::api::BookSource;
use crate::debounce::Debouncer;
use crate::error::AppError;
use crate::types::Query;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered sentinel reports before senders wait.
const SENTINEL_CHANNEL_CAPACITY: usize = 16;

/// One mounted catalog: raw query in, continuously updated view out.
pub struct CatalogSession<S>
where
    S: BookSource + 'static,
{
    debouncer: Debouncer<Query>,
    cache: PaginatedQueryCache<S>,
    controller: Arc<ScrollFetchController<S>>,
    sentinel: mpsc::Sender<Visibility>,
    observation: Option<Observation<S>>,
    follower: JoinHandle<()>,
}

impl<S> CatalogSession<S>
where
    S: BookSource + 'static,
{
    /// Mounts a session on the current tokio runtime and schedules the
    /// first page of `initial`.
    pub fn new(source: S, initial: Query, quiet_period: Duration, options: CacheOptions) -> Self {
        let debouncer = Debouncer::new(initial.clone(), quiet_period);
        let cache = PaginatedQueryCache::new(source, options);
        cache.view(&initial);

        let controller = Arc::new(ScrollFetchController::new(
            cache.clone(),
            debouncer.subscribe(),
        ));
        let (sentinel, events) = mpsc::channel(SENTINEL_CHANNEL_CAPACITY);
        let observation = controller.observe(events);

        // Apply each settled query to the cache as soon as it settles, so the
        // reset never waits for the next render.
        let follower = {
            let cache = cache.clone();
            let mut stable = debouncer.subscribe();
            tokio::spawn(async move {
                while stable.changed().await.is_ok() {
                    let query = stable.borrow_and_update().clone();
                    log::info!("Query settled: {}", query.key());
                    cache.view(&query);
                }
            })
        };

        Self {
            debouncer,
            cache,
            controller,
            sentinel,
            observation: Some(observation),
            follower,
        }
    }

    /// Records a raw filter edit.
    pub fn set_query(&self, query: Query) {
        self.debouncer.set(query);
    }

    /// Applies `edit` to the latest raw query.
    pub fn edit_query<F>(&self, edit: F) -> Result<(), AppError>
    where
        F: FnOnce(&Query) -> Result<Query, crate::types::ValidationError>,
    {
        let next = edit(&self.debouncer.latest())?;
        self.set_query(next);
        Ok(())
    }

    /// The query the cache is currently keyed on.
    pub fn stable_query(&self) -> Query {
        self.debouncer.current()
    }

    /// The current view of the stable query's result set.
    pub fn view(&self) -> CatalogView {
        self.cache.view(&self.stable_query())
    }

    /// Sender for sentinel visibility reports.
    pub fn sentinel(&self) -> mpsc::Sender<Visibility> {
        self.sentinel.clone()
    }

    /// Simulates scrolling the sentinel out of and back into full view,
    /// waiting for any fetch it starts.
    pub async fn scroll_to_end(&self) -> Option<Result<FetchOutcome, AppError>> {
        self.controller.on_visibility(Visibility::hidden());
        let trigger: Trigger = self.controller.on_visibility(Visibility::fully_visible());
        trigger.finish().await
    }

    /// Waits until no query edit is pending and no fetch is outstanding,
    /// then returns the view.
    pub async fn wait_for_idle(&self) -> CatalogView {
        let mut revisions = self.cache.subscribe();
        let mut in_flight = self.controller.subscribe_in_flight();
        let mut stable = self.debouncer.subscribe();

        loop {
            revisions.borrow_and_update();
            let busy = *in_flight.borrow_and_update();
            stable.borrow_and_update();

            let view = self.view();
            if view.is_settled() && !busy && !self.debouncer.is_pending() {
                return view;
            }

            tokio::select! {
                _ = revisions.changed() => {}
                _ = in_flight.changed() => {}
                _ = stable.changed() => {}
            }
        }
    }

    pub fn cache(&self) -> &PaginatedQueryCache<S> {
        &self.cache
    }

    pub fn controller(&self) -> &Arc<ScrollFetchController<S>> {
        &self.controller
    }

    /// Unmounts the session: stops observation and drops every cached page.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(observation) = self.observation.take() {
            observation.teardown();
        }
        self.follower.abort();
        self.cache.invalidate();
    }
}

impl<S> Drop for CatalogSession<S>
where
    S: BookSource + 'static,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<S> std::fmt::Debug for CatalogSession<S>
where
    S: BookSource + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSession")
            .field("stable_query", &self.debouncer.current())
            .field("cache", &self.cache)
            .finish()
    }
}
