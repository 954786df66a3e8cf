// src/error_recovery.rs
//! Retry with exponential backoff for remote calls.

use crate::error::AppError;
use std::time::Duration;

/// Runs `operation`, retrying up to `retries` more times on failure.
///
/// The delay before each retry doubles, capped at `max_delay`. Only the
/// last error is returned once the budget is spent.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = initial_delay;
    let max_attempts = retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_attempts => {
                log::warn!(
                    "Attempt {}/{} failed ({}), retrying after {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                delay = std::cmp::min(delay * 2, max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
