//! Debounced, cancellable writes
//!
//! [`Debouncer::schedule`] stores the latest value in a single slot and
//! restarts the quiet-period timer. When the timer fires, the slot is taken
//! and the action runs. Once running, an action is never aborted; a newer
//! value simply gets its own timer.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Coalesces bursts of values into one action call per quiet period
pub struct Debouncer<T> {
    /// Quiet period before the action runs
    delay: Duration,
    /// What to do with the settled value
    action: Action<T>,
    /// Latest value not yet handed to the action
    slot: Arc<Mutex<Option<T>>>,
    /// Cancels the currently armed timer
    timer: Option<CancellationToken>,
    /// Timer and write tasks, so teardown can wait for them
    tracker: TaskTracker,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer running `action` after `delay` of quiet
    pub fn new<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            action: Arc::new(move |value| action(value).boxed()),
            slot: Arc::new(Mutex::new(None)),
            timer: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Replace the pending value and restart the timer
    pub fn schedule(&mut self, value: T) {
        // The old timer is cancelled before the slot changes, so it can
        // never pick up the new value
        self.disarm();

        let token = CancellationToken::new();
        self.timer = Some(token.clone());

        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value);
        }

        let slot = Arc::clone(&self.slot);
        let action = Arc::clone(&self.action);
        let delay = self.delay;

        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let value = slot.lock().ok().and_then(|mut slot| {
                        if token.is_cancelled() { None } else { slot.take() }
                    });
                    if let Some(value) = value {
                        action(value).await;
                    }
                }
            }
        });
    }

    /// Whether a value is waiting for its timer
    pub fn is_pending(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Run the action for the pending value now, if there is one
    pub async fn flush(&mut self) {
        self.disarm();
        let value = self.slot.lock().ok().and_then(|mut slot| slot.take());
        if let Some(value) = value {
            (self.action)(value).await;
        }
    }

    /// Drop the pending value without running the action.
    /// Returns whether anything was dropped.
    pub fn cancel(&mut self) -> bool {
        self.disarm();
        self.slot.lock().ok().and_then(|mut slot| slot.take()).is_some()
    }

    /// Wait until every started action has finished
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}
