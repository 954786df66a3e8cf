//! Domain vocabulary: filter queries, fetched pages and the books they carry.

use thiserror::Error;

mod book;
mod page;
mod query;

pub use book::*;
pub use page::*;
pub use query::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Filter {field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("Filter {field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("Cursor must start at 1, got {0}")]
    CursorOutOfRange(u32),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },
}
