//! Single-slot delayed execution.
//!
//! [`Debouncer`] keeps one resettable timer and the most recent value handed
//! to [`Debouncer::call`]. Every call replaces the value and restarts the
//! timer, so a burst of calls collapses into one [`Debouncer::fired`]
//! resolution carrying the last value, `delay` after the last call.

use std::{pin::Pin, time::Duration};

use tokio::time::{Instant, Sleep};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    // Created lazily so the debouncer can be built outside a runtime.
    timer: Option<Pin<Box<Sleep>>>,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, timer: None, pending: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Store `value` and restart the quiet period.
    pub fn call(&mut self, value: T) {
        let deadline = Instant::now() + self.delay;
        match self.timer.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.timer = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
        self.pending = Some(value);
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves with the latest value once the quiet period has elapsed.
    ///
    /// Never resolves while nothing is pending. Cancel safe: dropping the
    /// future keeps the pending value and timer untouched.
    pub async fn fired(&mut self) -> T {
        loop {
            match (self.pending.is_some(), self.timer.as_mut()) {
                (true, Some(timer)) => {
                    timer.as_mut().await;
                    if let Some(value) = self.pending.take() {
                        return value;
                    }
                }
                _ => std::future::pending::<()>().await,
            }
        }
    }
}
