//! Deferred, coalescing writes
//!
//! State that changes in bursts (config mutations, registry edits) would
//! otherwise rewrite its storage file on every call. [`DelayedSave`] holds a
//! single pending write per owner: scheduling a new save cancels the pending
//! one and restarts the delay, so a burst of changes inside the window
//! produces exactly one write of the final state.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

/// One deferred-write slot with a fixed delay.
///
/// At most one write task is pending at any time; a newly scheduled save
/// always supersedes the previous one.
pub struct DelayedSave {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DelayedSave {
    /// Create a slot that defers writes by `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `save` to run after the configured delay.
    ///
    /// Cancels any previously scheduled save that has not fired yet. The
    /// cancel/reschedule pair happens under one lock, so concurrent
    /// schedulers can never leave two writes pending.
    pub async fn schedule<F>(&self, save: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;

        if let Some(previous) = pending.take() {
            trace!("Superseding pending save");
            previous.abort();
        }

        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            save.await;
        }));
    }
}
