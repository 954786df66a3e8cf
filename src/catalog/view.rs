// src/catalog/view.rs
//! The read-only state handed to presentation code.

use crate::error::AppError;
use crate::types::{Book, FetchState, Page};

/// Materialized state of one result set.
///
/// `items` is the concatenation of every page in cursor order. The view never
/// mixes items from different query keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogView {
    pub items: Vec<Book>,
    pub has_more: bool,
    pub is_loading_first: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
    pub state: FetchState,
    pub pages_loaded: usize,
}

impl CatalogView {
    /// Builds the view of a page sequence in `state`.
    pub(crate) fn materialize(pages: &[Page], state: &FetchState) -> Self {
        let items = pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect();
        let has_more = !matches!(state, FetchState::Exhausted)
            && pages.last().map_or(true, |page| page.has_more);

        Self {
            items,
            has_more,
            is_loading_first: matches!(state, FetchState::LoadingFirst),
            is_loading_more: matches!(state, FetchState::LoadingMore),
            error: state.error_message().map(str::to_string),
            state: state.clone(),
            pages_loaded: pages.len(),
        }
    }

    /// The surfaced failure as an error, if the last fetch failed.
    pub fn failure(&self) -> Option<AppError> {
        self.error.clone().map(AppError::PageUnavailable)
    }

    /// Whether nothing is being fetched for this result set right now.
    pub fn is_settled(&self) -> bool {
        !self.state.is_loading()
    }
}
