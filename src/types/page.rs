//! Pages of results and the fetch lifecycle of a result set.

use super::{Book, Cursor};
use std::fmt;

/// One fetched chunk of a result set. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The cursor this page was requested with.
    pub cursor: Cursor,
    pub items: Vec<Book>,
    pub has_more: bool,
    pub next_cursor: Cursor,
}

impl Page {
    /// Wraps a remote response fetched at `cursor`.
    pub fn fetched_at(cursor: Cursor, items: Vec<Book>, has_more: bool) -> Self {
        Self {
            cursor,
            items,
            has_more,
            next_cursor: cursor.next(),
        }
    }
}

/// Where a result set is in its fetch lifecycle.
///
/// Exactly one state exists per active query key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    LoadingFirst,
    LoadingMore,
    /// The last attempt failed after its retry; a new trigger may try again.
    Error(String),
    /// A page reported `has_more = false`; nothing further will be fetched.
    Exhausted,
}

impl FetchState {
    /// Whether a fetch is currently outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::LoadingFirst | Self::LoadingMore)
    }

    /// Whether a new fetch may start from this state.
    pub fn accepts_fetch(&self) -> bool {
        matches!(self, Self::Idle | Self::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LoadingFirst => write!(f, "loading-first"),
            Self::LoadingMore => write!(f, "loading-more"),
            Self::Error(message) => write!(f, "error({})", message),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_and_error_accept_a_fetch() {
        assert!(FetchState::Idle.accepts_fetch());
        assert!(FetchState::Error("timeout".to_string()).accepts_fetch());
        assert!(!FetchState::LoadingFirst.accepts_fetch());
        assert!(!FetchState::LoadingMore.accepts_fetch());
        assert!(!FetchState::Exhausted.accepts_fetch());
    }
}
