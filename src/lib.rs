// src/lib.rs
//! bookshelf library: incrementally loads a filterable, paginated book catalog.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `CatalogConfig`, `CommandLineInput`
//! - **Domain types**: `Query`, `QueryKey`, `Cursor`, `Book`, `Page`, `FetchState`
//! - **API client**: `BookSource`, `BookHttpClient`, parsers
//! - **Catalog core**: `Debouncer`, `PaginatedQueryCache`, `ScrollFetchController`,
//!   `CatalogSession`, `CatalogView`

pub mod api;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod error;
pub mod error_recovery;
pub mod listing;
pub mod types;

// --- Error Handling ---
pub use crate::error::AppError;
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CatalogConfig, CommandLineInput};

// --- Domain Types ---
pub use crate::types::{Book, Cursor, FetchState, Page, Query, QueryKey, Review};

// --- API Client ---
pub use crate::api::{
    parser::{parse_books_body, parse_books_response},
    BookHttpClient, BookSource, RemotePage,
};

// --- Catalog Core ---
pub use crate::catalog::{
    CacheOptions, CatalogSession, CatalogView, FetchOutcome, IgnoreReason, PaginatedQueryCache,
    ScrollFetchController, SkipReason, Trigger, Visibility,
};
pub use crate::debounce::Debouncer;
