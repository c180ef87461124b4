//! Debounce timers for sequence slots

use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::{AbortHandle, LocalSet};
use tracing::error;

/// Arms one-shot timers for sequence slots
pub trait TimerScheduler {
    /// Run `fire` once after `delay`.
    ///
    /// Returns `None` when no timer could be armed; the caller then drops the
    /// keystroke instead of waiting for a timeout that never comes.
    fn schedule(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> Option<AbortHandle>;
}

/// Timers spawned onto a task set owned by the scheduler.
///
/// Timers only make progress while the set is driven with
/// [`LocalTimers::run_until`]. Cloning shares the same set.
#[derive(Clone, Default)]
pub struct LocalTimers {
    set: Rc<LocalSet>,
}

impl LocalTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `future` to completion with pending timers running alongside it
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.set.run_until(future).await
    }
}

impl TimerScheduler for LocalTimers {
    fn schedule(&self, delay: Duration, fire: Box<dyn FnOnce()>) -> Option<AbortHandle> {
        if Handle::try_current().is_err() {
            error!("no tokio runtime on this thread, sequence keystroke dropped");
            return None;
        }

        let task = self.set.spawn_local(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        Some(task.abort_handle())
    }
}
