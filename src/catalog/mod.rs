// src/catalog/mod.rs
//! Incremental loading of a filtered catalog.
//!
//! Raw query edits settle through a debouncer into a stable query; the
//! stable query keys a page cache; sentinel visibility drives the cache's
//! next-page fetches. Rendering the resulting view is left to the caller.

pub mod cache;
pub mod controller;
pub mod session;
pub mod view;

pub use cache::{CacheOptions, FetchOutcome, PaginatedQueryCache, SkipReason};
pub use controller::{IgnoreReason, Observation, ScrollFetchController, Trigger, Visibility};
pub use session::CatalogSession;
pub use view::CatalogView;
