// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Cursor used for the first page of any result set.
pub const INITIAL_CURSOR: u32 = 1;

/// Automatic retries granted to a single fetch attempt before its error is
/// surfaced in the view.
pub const DEFAULT_RETRY_BUDGET: u32 = 1;

/// Pause in milliseconds before the automatic retry of a failed page fetch.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 250;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(DEFAULT_RETRY_DELAY_MS);

// ---------------------------------------------------------------------------
// Query editing
// ---------------------------------------------------------------------------

/// Quiet period after the last filter edit before the query is considered stable.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Sentinel observation
// ---------------------------------------------------------------------------

/// Fraction of the sentinel that must be inside the viewport to count as visible.
pub const FULL_VISIBILITY_THRESHOLD: f64 = 1.0;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
