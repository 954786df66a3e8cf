//! Book records as returned by the catalog service.
//!
//! The core treats a [`Book`] as opaque apart from its `id`, which the
//! presentation layer uses as a rendering key. Fields default when the
//! service omits them so a sparse record still renders.

use serde::{Deserialize, Serialize};
use url::Url;

/// A single review attached to a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
}

/// One catalog record.
///
/// `id` is unique within a result set; different seeds may reuse ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publisher: String,
    /// Cover image URL, or an empty string when the record has none.
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub likes: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Book {
    /// The cover image as a parsed URL, if present and well-formed.
    pub fn image_url(&self) -> Option<Url> {
        if self.image.trim().is_empty() {
            return None;
        }
        Url::parse(&self.image).ok()
    }

    /// Authors joined for display, in the order the service listed them.
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_record_uses_defaults() {
        let book: Book = serde_json::from_str(r#"{"id": 7, "title": "Dune"}"#).unwrap();
        assert_eq!(book.id, 7);
        assert_eq!(book.title, "Dune");
        assert!(book.authors.is_empty());
        assert!(book.reviews.is_empty());
        assert_eq!(book.likes, 0.0);
        assert_eq!(book.image_url(), None);
    }

    #[test]
    fn image_url_parses_when_present() {
        let book: Book = serde_json::from_str(
            r#"{"id": 1, "image": "https://picsum.photos/seed/1/200/300", "authors": ["A", "B"]}"#,
        )
        .unwrap();
        assert_eq!(
            book.image_url().map(|u| u.host_str().map(str::to_string)),
            Some(Some("picsum.photos".to_string()))
        );
        assert_eq!(book.author_line(), "A, B");
    }
}
