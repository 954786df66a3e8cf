// tests/common/mod.rs
//! Shared fixtures: a scripted in-memory book source and query helpers.

#![allow(dead_code)]

use bookshelf::{AppError, Book, BookSource, CacheOptions, Cursor, Query, QueryKey, RemotePage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const QUIET: Duration = Duration::from_millis(500);

type Script = dyn Fn(&QueryKey, Cursor, usize) -> Result<RemotePage, String> + Send + Sync;

/// A [`BookSource`] whose answers come from a closure, with simulated
/// latency and a log of every call.
pub struct ScriptedSource {
    script: Box<Script>,
    latency: Duration,
    calls: Mutex<Vec<(QueryKey, Cursor)>>,
}

impl ScriptedSource {
    /// `script` receives the key, the cursor and the zero-based call index.
    pub fn new<F>(latency: Duration, script: F) -> Arc<Self>
    where
        F: Fn(&QueryKey, Cursor, usize) -> Result<RemotePage, String> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            latency,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(QueryKey, Cursor)> {
        self.calls.lock().clone()
    }

    pub fn cursors(&self) -> Vec<u32> {
        self.calls.lock().iter().map(|(_, cursor)| cursor.get()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl BookSource for ScriptedSource {
    async fn fetch_page(&self, key: &QueryKey, cursor: Cursor) -> Result<RemotePage, AppError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push((key.clone(), cursor));
            calls.len() - 1
        };
        tokio::time::sleep(self.latency).await;
        (self.script)(key, cursor, index).map_err(AppError::MalformedResponse)
    }
}

/// `count` books with consecutive ids starting at `first_id`.
pub fn books(first_id: u64, count: u64) -> Vec<Book> {
    (first_id..first_id + count)
        .map(|id| {
            serde_json::from_value(serde_json::json!({
                "id": id,
                "isbn": format!("978-0-{:06}-0", id),
                "title": format!("Book {}", id),
                "authors": [format!("Author {}", id)],
                "publisher": "Test House",
                "likes": 5.0,
                "reviews": []
            }))
            .expect("fixture book should deserialize")
        })
        .collect()
}

pub fn remote(first_id: u64, count: u64, has_more: bool) -> Result<RemotePage, String> {
    Ok(RemotePage {
        items: books(first_id, count),
        has_more,
    })
}

/// The query used throughout the catalog scenarios.
pub fn scenario_query() -> Query {
    Query::new("en", 553218.0, 5.0, 3.0).expect("scenario query should be valid")
}

pub fn fast_retry() -> CacheOptions {
    CacheOptions {
        retry_budget: 1,
        retry_delay: Duration::from_millis(10),
    }
}

pub fn ids(items: &[Book]) -> Vec<u64> {
    items.iter().map(|book| book.id).collect()
}
