//! Catalog filter queries and the key that identifies their result set.

use super::ValidationError;
use crate::constants::INITIAL_CURSOR;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page number used to request the next chunk of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(u32);

impl Cursor {
    /// The cursor of the first page.
    pub const INITIAL: Cursor = Cursor(INITIAL_CURSOR);

    /// Creates a cursor, rejecting page numbers below the first page.
    pub fn new(page: u32) -> Result<Self, ValidationError> {
        if page < INITIAL_CURSOR {
            return Err(ValidationError::CursorOutOfRange(page));
        }
        Ok(Self(page))
    }

    /// The cursor that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The filter fields of a catalog request.
///
/// A query is immutable: every edit produces a new value. Two queries are
/// equal when every field is equal, page included. Identity of the result
/// set ignores the page; use [`Query::key`] for that.
///
/// Numeric filters are kept at whatever precision the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    language: String,
    seed: f64,
    likes_count: f64,
    reviews_count: f64,
    page: Cursor,
}

impl Query {
    /// Creates a validated query positioned at the first page.
    pub fn new(
        language: impl Into<String>,
        seed: f64,
        likes_count: f64,
        reviews_count: f64,
    ) -> Result<Self, ValidationError> {
        let language = language.into();
        let language = language.trim();
        if language.is_empty() {
            return Err(ValidationError::EmptyField("language"));
        }
        let seed = ensure_finite("seed", seed)?;
        let likes_count = ensure_threshold("likesCount", likes_count)?;
        let reviews_count = ensure_threshold("reviewsCount", reviews_count)?;

        Ok(Self {
            language: language.to_string(),
            seed,
            likes_count,
            reviews_count,
            page: Cursor::INITIAL,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn seed(&self) -> f64 {
        self.seed
    }

    pub fn likes_count(&self) -> f64 {
        self.likes_count
    }

    pub fn reviews_count(&self) -> f64 {
        self.reviews_count
    }

    pub fn page(&self) -> Cursor {
        self.page
    }

    pub fn with_language(&self, language: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(language, self.seed, self.likes_count, self.reviews_count)
            .map(|q| q.with_page(self.page))
    }

    pub fn with_seed(&self, seed: f64) -> Result<Self, ValidationError> {
        let seed = ensure_finite("seed", seed)?;
        Ok(Self { seed, ..self.clone() })
    }

    pub fn with_likes_count(&self, likes_count: f64) -> Result<Self, ValidationError> {
        let likes_count = ensure_threshold("likesCount", likes_count)?;
        Ok(Self {
            likes_count,
            ..self.clone()
        })
    }

    pub fn with_reviews_count(&self, reviews_count: f64) -> Result<Self, ValidationError> {
        let reviews_count = ensure_threshold("reviewsCount", reviews_count)?;
        Ok(Self {
            reviews_count,
            ..self.clone()
        })
    }

    /// Returns a copy positioned at `page`. The page never affects [`Query::key`].
    pub fn with_page(&self, page: Cursor) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// The effective query key: every filter except the page.
    pub fn key(&self) -> QueryKey {
        QueryKey {
            language: self.language.clone(),
            seed: self.seed,
            likes_count: self.likes_count,
            reviews_count: self.reviews_count,
        }
    }
}

/// Rejects NaN and infinities. Negative zero is returned as zero: equal
/// queries must serialize to the same key.
fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field, value });
    }
    Ok(if value == 0.0 { 0.0 } else { value })
}

fn ensure_threshold(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(value)
}

/// Identifies one logical result set: the filter fields without the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryKey {
    language: String,
    seed: f64,
    likes_count: f64,
    reviews_count: f64,
}

impl QueryKey {
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Stable textual form used as the registry key of the page cache.
    pub fn serialized(&self) -> String {
        // Fields are validated finite, so JSON encoding cannot fail here;
        // fall back to Debug formatting rather than panic.
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Request parameters for fetching the page at `cursor`, all string-encoded.
    pub fn request_params(&self, cursor: Cursor) -> Vec<(&'static str, String)> {
        vec![
            ("page", cursor.to_string()),
            ("language", self.language.clone()),
            ("seed", self.seed.to_string()),
            ("likesCount", self.likes_count.to_string()),
            ("reviewsCount", self.reviews_count.to_string()),
        ]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} seed={} likes>={} reviews>={}",
            self.language, self.seed, self.likes_count, self.reviews_count
        )
    }
}
