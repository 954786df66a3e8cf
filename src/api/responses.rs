// src/api/responses.rs
//! Wire shapes of the catalog service.

use crate::types::Book;
use serde::{Deserialize, Serialize};

/// Body of a `GET /books` response.
///
/// Both fields are optional on the wire: a missing `books` is an empty page
/// and a missing `hasMore` ends the result set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksResponse {
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub has_more: bool,
}

/// What a single remote call yields, before the cache wraps it into a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemotePage {
    pub items: Vec<Book>,
    pub has_more: bool,
}

impl From<BooksResponse> for RemotePage {
    fn from(response: BooksResponse) -> Self {
        Self {
            items: response.books,
            has_more: response.has_more,
        }
    }
}
