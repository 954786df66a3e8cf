// src/debounce.rs
//! Collapses a rapidly changing value into a stable one.
//!
//! A [`Debouncer`] holds two cells: the raw input, written on every edit,
//! and the stable output, which only follows the input once it has been
//! quiet for the configured period. Each new input restarts the period;
//! there is no cap on how often that can happen.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A continuously updated cell that publishes its input after a quiet period.
///
/// The initial value is published immediately. Dropping the debouncer stops
/// its timer task; a pending update is discarded.
#[derive(Debug)]
pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    quiet_period: Duration,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Starts a debouncer on the current tokio runtime.
    pub fn new(initial: T, quiet_period: Duration) -> Self {
        let (input, raw) = watch::channel(initial.clone());
        let (stable, output) = watch::channel(initial);
        let task = tokio::spawn(settle(raw, stable, quiet_period));
        Self {
            input,
            output,
            quiet_period,
            task,
        }
    }

    /// Records a new input value. Equal values do not restart the quiet period.
    pub fn set(&self, value: T) {
        self.input.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// The latest raw input, settled or not.
    pub fn latest(&self) -> T {
        self.input.borrow().clone()
    }

    /// The stable value.
    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    /// Whether an input is waiting for its quiet period to elapse.
    pub fn is_pending(&self) -> bool {
        *self.input.borrow() != *self.output.borrow()
    }

    /// A receiver notified each time the stable value changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Timer loop: waits for an input change, then for `quiet_period` without
/// another one, then publishes the latest input.
async fn settle<T>(mut raw: watch::Receiver<T>, stable: watch::Sender<T>, quiet_period: Duration)
where
    T: Clone + PartialEq,
{
    while raw.changed().await.is_ok() {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(quiet_period) => break,
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let value = raw.borrow_and_update().clone();
        stable.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                log::debug!("Debounced value settled after {:?}", quiet_period);
                *current = value;
                true
            }
        });
    }
}
