// src/api/mod.rs
//! Catalog service interaction: the ability to retrieve pages of books.
//!
//! Business logic depends on [`BookSource`], never on HTTP details.

pub mod client;
pub mod parser;
pub mod responses;

use crate::error::AppError;
use crate::types::{Cursor, QueryKey};

pub use client::BookHttpClient;
pub use responses::RemotePage;

/// The ability to retrieve one page of a result set.
///
/// Implementations may be slow and may fail; callers treat any error as a
/// remote failure. The page cursor is passed through unchanged.
#[async_trait::async_trait]
pub trait BookSource: Send + Sync {
    async fn fetch_page(&self, key: &QueryKey, cursor: Cursor) -> Result<RemotePage, AppError>;
}

#[async_trait::async_trait]
impl<S: BookSource + ?Sized> BookSource for std::sync::Arc<S> {
    async fn fetch_page(&self, key: &QueryKey, cursor: Cursor) -> Result<RemotePage, AppError> {
        (**self).fetch_page(key, cursor).await
    }
}
