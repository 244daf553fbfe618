//! Cancellable scheduled callbacks
//!
//! A `ScheduledTimer` is a spawned tokio task paired with its own
//! cancellation token. The token is a child of the owner's shutdown token, so
//! dropping the owner (which cancels shutdown) stops every timer it created.
//!
//! Cancellation is cooperative: the task observes `stop` at its next select
//! point, and any work that completes after cancellation must check
//! `stop.is_cancelled()` before touching shared state.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub(crate) struct ScheduledTimer {
    handle: JoinHandle<()>,
    stop: CancellationToken,
}

impl ScheduledTimer {
    pub(crate) fn spawn<F, Fut>(parent: &CancellationToken, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let stop = parent.child_token();
        let handle = tokio::spawn(body(stop.clone()));
        Self { handle, stop }
    }

    /// Signal the timer to stop. Safe to call from inside the timer's own task.
    pub(crate) fn cancel(self) {
        self.stop.cancel();
    }

    /// Still scheduled: not cancelled and not run to completion
    pub(crate) fn is_live(&self) -> bool {
        !self.stop.is_cancelled() && !self.handle.is_finished()
    }
}

/// Cancel the timer in `slot`, if any. Returns whether one was present.
pub(crate) fn cancel_slot(slot: &mut Option<ScheduledTimer>) -> bool {
    match slot.take() {
        Some(timer) => {
            timer.cancel();
            true
        }
        None => false,
    }
}

pub(crate) fn is_slot_live(slot: &Option<ScheduledTimer>) -> bool {
    slot.as_ref().map(ScheduledTimer::is_live).unwrap_or(false)
}
