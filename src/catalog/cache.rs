// src/catalog/cache.rs
//! Keyed page cache for incrementally loaded result sets.
//!
//! The cache owns, per query key, an append-only sequence of pages and a
//! [`FetchState`]. Only one key is active at a time: observing a different
//! key tears the old entry down and registers a fresh one under a new
//! generation before any fetch for the new key starts.
//!
//! Fetches are split into a synchronous `begin` step, which checks and moves
//! the fetch state while the registry lock is held, and an asynchronous
//! remote call whose result is applied only if the entry's generation still
//! matches. The lock is never held across an `.await`.

use super::view::CatalogView;
use crate::api::{BookSource, RemotePage};
use crate::constants::{DEFAULT_RETRY_BUDGET, DEFAULT_RETRY_DELAY};
use crate::error::AppError;
use crate::error_recovery::retry_with_backoff;
use crate::types::{Cursor, FetchState, Page, Query, QueryKey};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Retry policy for page fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Automatic retries after a failed remote call.
    pub retry_budget: u32,
    /// Delay before the first retry; later retries back off exponentially.
    pub retry_delay: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// How a call to [`PaginatedQueryCache::fetch_next_page`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A page was appended to the active sequence.
    Appended {
        cursor: Cursor,
        items: usize,
        has_more: bool,
    },
    /// No remote call was made.
    Skipped(SkipReason),
    /// The response arrived after its key was superseded and was dropped.
    Discarded { generation: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch for this key is already outstanding.
    InFlight,
    /// The last page reported no further results.
    Exhausted,
    /// Another key became active; the request belonged to an old query.
    Superseded,
}

/// One registered result set.
#[derive(Debug)]
struct Entry {
    key: QueryKey,
    generation: u64,
    pages: Vec<Page>,
    state: FetchState,
}

impl Entry {
    fn new(key: QueryKey, generation: u64) -> Self {
        Self {
            key,
            generation,
            pages: Vec::new(),
            state: FetchState::Idle,
        }
    }

    /// Moves the entry into a loading state and returns what to fetch.
    fn begin(&mut self, registry_key: &str) -> Result<FetchTicket, SkipReason> {
        if !self.state.accepts_fetch() {
            return Err(if self.state == FetchState::Exhausted {
                SkipReason::Exhausted
            } else {
                SkipReason::InFlight
            });
        }

        let cursor = self
            .pages
            .last()
            .map_or(Cursor::INITIAL, |page| page.next_cursor);
        self.state = if self.pages.is_empty() {
            FetchState::LoadingFirst
        } else {
            FetchState::LoadingMore
        };
        log::debug!("{}: fetching page {} ({})", self.key, cursor, self.state);

        Ok(FetchTicket {
            registry_key: registry_key.to_string(),
            key: self.key.clone(),
            generation: self.generation,
            cursor,
        })
    }

    fn expected_cursor(&self) -> Cursor {
        self.pages
            .last()
            .map_or(Cursor::INITIAL, |page| page.next_cursor)
    }
}

/// Everything needed to perform and later apply one remote call.
#[derive(Debug, Clone)]
struct FetchTicket {
    registry_key: String,
    key: QueryKey,
    generation: u64,
    cursor: Cursor,
}

/// Explicit map from serialized query key to its page sequence and state.
#[derive(Debug, Default)]
struct Registry {
    entries: IndexMap<String, Entry>,
    active: Option<String>,
    generations: u64,
}

impl Registry {
    /// Makes `key` the active key, resetting state if it differs from the
    /// previously observed one. Returns whether a new entry was registered.
    fn activate(&mut self, key: &QueryKey) -> (String, bool) {
        let registry_key = key.serialized();
        if self.active.as_deref() == Some(registry_key.as_str())
            && self.entries.contains_key(&registry_key)
        {
            return (registry_key, false);
        }

        if let Some(previous) = self.active.take() {
            if let Some(old) = self.entries.shift_remove(&previous) {
                log::debug!(
                    "Query changed; discarding {} page(s) of generation {} ({})",
                    old.pages.len(),
                    old.generation,
                    old.key
                );
            }
        }

        self.generations += 1;
        let generation = self.generations;
        log::debug!("Activating generation {} for {}", generation, key);
        self.entries
            .insert(registry_key.clone(), Entry::new(key.clone(), generation));
        self.active = Some(registry_key.clone());
        (registry_key, true)
    }

    /// Registers `key` only when no key is active yet. A request for any
    /// key other than the active one is refused.
    fn adopt(&mut self, key: &QueryKey) -> Option<String> {
        if self.active.is_none() {
            return Some(self.activate(key).0);
        }
        let registry_key = key.serialized();
        (self.active.as_deref() == Some(registry_key.as_str())).then_some(registry_key)
    }

    fn current(&mut self, ticket: &FetchTicket) -> Option<&mut Entry> {
        self.entries
            .get_mut(&ticket.registry_key)
            .filter(|entry| entry.generation == ticket.generation)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.active = None;
    }
}

struct Shared<S> {
    source: S,
    options: CacheOptions,
    registry: Mutex<Registry>,
    revision: watch::Sender<u64>,
}

/// Paginated query cache over a [`BookSource`].
///
/// The handle is cheap to clone; clones share one registry.
pub struct PaginatedQueryCache<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for PaginatedQueryCache<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> std::fmt::Debug for PaginatedQueryCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatedQueryCache")
            .field("options", &self.shared.options)
            .field("registry", &*self.shared.registry.lock())
            .finish()
    }
}

impl<S> PaginatedQueryCache<S>
where
    S: BookSource + 'static,
{
    pub fn new(source: S, options: CacheOptions) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                source,
                options,
                registry: Mutex::new(Registry::default()),
                revision,
            }),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.shared.options
    }

    /// Returns the current state of `query`'s result set.
    ///
    /// Observing a key that differs from the previous one resets the cache
    /// to an empty sequence and schedules the first page in the background.
    /// Must be called from within a tokio runtime for that scheduling to
    /// happen; otherwise the key is registered idle.
    pub fn view(&self, query: &Query) -> CatalogView {
        let key = query.key();
        let (view, ticket) = {
            let mut registry = self.shared.registry.lock();
            let (registry_key, activated) = registry.activate(&key);
            let can_spawn = tokio::runtime::Handle::try_current().is_ok();
            let Some(entry) = registry.entries.get_mut(&registry_key) else {
                return CatalogView::default();
            };
            let ticket = if activated && can_spawn {
                entry.begin(&registry_key).ok()
            } else {
                None
            };
            (CatalogView::materialize(&entry.pages, &entry.state), ticket)
        };

        if let Some(ticket) = ticket {
            self.notify();
            let cache = self.clone();
            tokio::spawn(async move {
                if let Err(e) = cache.run(ticket).await {
                    log::error!("First page could not be loaded: {}", e);
                }
            });
        }
        view
    }

    /// Returns the state of `key` if it is the active key, without
    /// registering it or scheduling anything.
    pub fn snapshot(&self, key: &QueryKey) -> Option<CatalogView> {
        let registry = self.shared.registry.lock();
        let active = registry.active.as_deref()?;
        if active != key.serialized() {
            return None;
        }
        registry
            .entries
            .get(active)
            .map(|entry| CatalogView::materialize(&entry.pages, &entry.state))
    }

    /// Requests the next page of `query`'s result set.
    ///
    /// Makes no remote call while a fetch is outstanding, after the result
    /// set is exhausted, or when `query` is no longer the active key; only
    /// [`view`](Self::view) switches keys. A failed call is retried within
    /// the retry budget; if that fails too, the entry moves to `error` and
    /// the error is returned. Existing pages are never touched by a failure.
    pub async fn fetch_next_page(&self, query: &Query) -> Result<FetchOutcome, AppError> {
        let key = query.key();
        let ticket = {
            let mut registry = self.shared.registry.lock();
            match registry.adopt(&key) {
                Some(registry_key) => match registry.entries.get_mut(&registry_key) {
                    Some(entry) => entry.begin(&registry_key),
                    None => Err(SkipReason::Superseded),
                },
                None => Err(SkipReason::Superseded),
            }
        };

        match ticket {
            Ok(ticket) => {
                self.notify();
                self.run(ticket).await
            }
            Err(reason) => {
                log::debug!("{}: next page skipped ({:?})", key, reason);
                Ok(FetchOutcome::Skipped(reason))
            }
        }
    }

    /// Tears down every registered result set. Responses still in flight
    /// are discarded when they arrive.
    pub fn invalidate(&self) {
        self.shared.registry.lock().clear();
        self.notify();
    }

    /// A receiver bumped on every state change of the cache.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    async fn run(&self, ticket: FetchTicket) -> Result<FetchOutcome, AppError> {
        let options = &self.shared.options;
        let source = &self.shared.source;
        let key = &ticket.key;
        let cursor = ticket.cursor;

        let result = retry_with_backoff(
            move |_| source.fetch_page(key, cursor),
            options.retry_budget,
            options.retry_delay,
            options.retry_delay * 4,
        )
        .await;

        let outcome = self.complete(&ticket, result);
        self.notify();
        outcome
    }

    /// Applies a finished remote call to its entry, if still current.
    fn complete(
        &self,
        ticket: &FetchTicket,
        result: Result<RemotePage, AppError>,
    ) -> Result<FetchOutcome, AppError> {
        let mut registry = self.shared.registry.lock();
        let Some(entry) = registry.current(ticket) else {
            log::warn!(
                "Discarding page {} of superseded generation {} ({})",
                ticket.cursor,
                ticket.generation,
                ticket.key
            );
            return Ok(FetchOutcome::Discarded {
                generation: ticket.generation,
            });
        };

        match result {
            Ok(remote) => {
                if entry.expected_cursor() != ticket.cursor {
                    log::warn!(
                        "{}: dropping out-of-order page {} (expected {})",
                        entry.key,
                        ticket.cursor,
                        entry.expected_cursor()
                    );
                    return Ok(FetchOutcome::Discarded {
                        generation: ticket.generation,
                    });
                }

                let page = Page::fetched_at(ticket.cursor, remote.items, remote.has_more);
                let outcome = FetchOutcome::Appended {
                    cursor: page.cursor,
                    items: page.items.len(),
                    has_more: page.has_more,
                };
                entry.state = if page.has_more {
                    FetchState::Idle
                } else {
                    FetchState::Exhausted
                };
                log::info!(
                    "{}: page {} arrived with {} book(s){}",
                    entry.key,
                    page.cursor,
                    page.items.len(),
                    if page.has_more { "" } else { ", end of results" }
                );
                entry.pages.push(page);
                Ok(outcome)
            }
            Err(e) => {
                log::error!("{}: page {} failed: {}", entry.key, ticket.cursor, e);
                entry.state = FetchState::Error(e.to_string());
                Err(e)
            }
        }
    }

    fn notify(&self) {
        self.shared.revision.send_modify(|revision| *revision += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Book;
    use std::collections::VecDeque;

    /// Source answering from a script, recording every call.
    struct Scripted {
        answers: Mutex<VecDeque<Result<RemotePage, String>>>,
        calls: Mutex<Vec<(QueryKey, Cursor)>>,
        latency: Duration,
    }

    impl Scripted {
        fn new(answers: Vec<Result<RemotePage, String>>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: Mutex::default(),
                latency,
            })
        }

        fn cursors(&self) -> Vec<u32> {
            self.calls.lock().iter().map(|(_, c)| c.get()).collect()
        }
    }

    #[async_trait::async_trait]
    impl BookSource for Scripted {
        async fn fetch_page(&self, key: &QueryKey, cursor: Cursor) -> Result<RemotePage, AppError> {
            self.calls.lock().push((key.clone(), cursor));
            tokio::time::sleep(self.latency).await;
            let answer = self.answers.lock().pop_front();
            match answer {
                Some(Ok(page)) => Ok(page),
                Some(Err(message)) => Err(AppError::MalformedResponse(message)),
                None => Ok(RemotePage::default()),
            }
        }
    }

    fn books(from: u64, count: u64) -> Vec<Book> {
        (from..from + count)
            .map(|id| serde_json::from_value(serde_json::json!({ "id": id })).unwrap())
            .collect()
    }

    fn page(from: u64, count: u64, has_more: bool) -> Result<RemotePage, String> {
        Ok(RemotePage {
            items: books(from, count),
            has_more,
        })
    }

    fn query() -> Query {
        Query::new("en", 553218.0, 5.0, 3.0).unwrap()
    }

    fn options() -> CacheOptions {
        CacheOptions {
            retry_budget: 1,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_starts_at_one_and_increases() {
        let source = Scripted::new(
            vec![page(0, 2, true), page(2, 2, true), page(4, 1, false)],
            Duration::ZERO,
        );
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        for _ in 0..3 {
            cache.fetch_next_page(&q).await.unwrap();
        }
        assert_eq!(source.cursors(), vec![1, 2, 3]);

        let view = cache.snapshot(&q.key()).unwrap();
        assert_eq!(view.items.len(), 5);
        assert_eq!(view.state, FetchState::Exhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_issue_one_remote_call() {
        let source = Scripted::new(vec![page(0, 3, true)], Duration::from_millis(100));
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        let (first, second) = tokio::join!(cache.fetch_next_page(&q), cache.fetch_next_page(&q));

        assert!(matches!(first.unwrap(), FetchOutcome::Appended { items: 3, .. }));
        assert_eq!(second.unwrap(), FetchOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(source.cursors(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_key_makes_no_more_calls() {
        let source = Scripted::new(vec![page(0, 1, false)], Duration::ZERO);
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        cache.fetch_next_page(&q).await.unwrap();
        let outcome = cache.fetch_next_page(&q).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::Exhausted));
        assert_eq!(source.cursors(), vec![1]);
        assert!(!cache.snapshot(&q.key()).unwrap().has_more);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_is_retried_transparently() {
        let source = Scripted::new(
            vec![Err("connection reset".to_string()), page(0, 4, true)],
            Duration::ZERO,
        );
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        let outcome = cache.fetch_next_page(&q).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Appended { items: 4, .. }));
        assert_eq!(source.cursors(), vec![1, 1]);
        let view = cache.snapshot(&q.key()).unwrap();
        assert_eq!(view.error, None);
        assert_eq!(view.items.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn second_failure_surfaces_and_keeps_pages() {
        let source = Scripted::new(
            vec![
                page(0, 2, true),
                Err("boom".to_string()),
                Err("boom again".to_string()),
                page(2, 2, false),
            ],
            Duration::ZERO,
        );
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        cache.fetch_next_page(&q).await.unwrap();
        let err = cache.fetch_next_page(&q).await.unwrap_err();
        assert!(err.is_network_or_server());

        let view = cache.snapshot(&q.key()).unwrap();
        assert_eq!(view.items.len(), 2);
        assert!(view.has_more);
        assert!(view.error.as_deref().unwrap().contains("boom again"));

        // A new trigger tries the same cursor again.
        cache.fetch_next_page(&q).await.unwrap();
        assert_eq!(source.cursors(), vec![1, 2, 2, 2]);
        let view = cache.snapshot(&q.key()).unwrap();
        assert_eq!(view.items.len(), 4);
        assert_eq!(view.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn key_change_resets_and_discards_stale_response() {
        let source = Scripted::new(
            vec![page(100, 5, true), page(0, 2, true)],
            Duration::from_millis(50),
        );
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let old = query();
        let new = old.with_seed(42.0).unwrap();

        let stale = {
            let cache = cache.clone();
            let old = old.clone();
            tokio::spawn(async move { cache.fetch_next_page(&old).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // The key change is applied synchronously, before the old call resolves.
        let view = cache.view(&new);
        assert!(view.items.is_empty());
        assert!(view.is_loading_first);
        assert!(cache.snapshot(&old.key()).is_none());

        let stale = stale.await.unwrap().unwrap();
        assert!(matches!(stale, FetchOutcome::Discarded { generation: 1 }));

        let mut revisions = cache.subscribe();
        while cache.snapshot(&new.key()).unwrap().is_loading_first {
            revisions.changed().await.unwrap();
        }
        let view = cache.snapshot(&new.key()).unwrap();
        let ids: Vec<u64> = view.items.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn next_page_of_an_old_key_is_refused() {
        let source = Scripted::new(
            vec![page(0, 2, true), page(100, 3, true)],
            Duration::from_millis(20),
        );
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let old = query();
        let new = old.with_language("de").unwrap();

        cache.fetch_next_page(&old).await.unwrap();
        let view = cache.view(&new);
        assert!(view.is_loading_first);

        let outcome = cache.fetch_next_page(&old).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Skipped(SkipReason::Superseded));
        assert!(cache.snapshot(&old.key()).is_none());

        let mut revisions = cache.subscribe();
        while cache.snapshot(&new.key()).unwrap().is_loading_first {
            revisions.changed().await.unwrap();
        }
        assert_eq!(cache.snapshot(&new.key()).unwrap().items.len(), 3);
        assert_eq!(source.cursors(), vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn page_field_does_not_change_the_key() {
        let source = Scripted::new(vec![page(0, 1, true), page(1, 1, true)], Duration::ZERO);
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        cache.fetch_next_page(&q).await.unwrap();
        cache
            .fetch_next_page(&q.with_page(Cursor::new(9).unwrap()))
            .await
            .unwrap();

        assert_eq!(source.cursors(), vec![1, 2]);
        assert_eq!(cache.snapshot(&q.key()).unwrap().items.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_drops_in_flight_results() {
        let source = Scripted::new(vec![page(0, 3, true)], Duration::from_millis(20));
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let q = query();

        let pending = {
            let cache = cache.clone();
            let q = q.clone();
            tokio::spawn(async move { cache.fetch_next_page(&q).await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        cache.invalidate();

        let outcome = pending.await.unwrap().unwrap();
        assert!(matches!(outcome, FetchOutcome::Discarded { .. }));
        assert!(cache.snapshot(&q.key()).is_none());
    }

    #[test]
    fn view_outside_a_runtime_registers_idle() {
        let source = Scripted::new(vec![], Duration::ZERO);
        let cache = PaginatedQueryCache::new(source.clone(), options());
        let view = cache.view(&query());
        assert_eq!(view.state, FetchState::Idle);
        assert!(source.cursors().is_empty());
    }
}
