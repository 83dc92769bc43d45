//! Fire-and-forget execution of background work.
//!
//! [`TaskRunner::schedule`] spawns a tokio task and returns at once. Tasks are
//! unordered, never cancelled and never timed out by the runner; whatever they
//! do about slow I/O is up to them. A panicking task is logged and does not
//! affect other tasks.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::task::TaskTracker;

/// Handle to a scheduled task.
///
/// Callers may drop it; the task keeps running.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    inner: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the task to finish.
    pub async fn join(self) -> Result<(), JoinError> {
        self.inner.await
    }
}

/// Spawns and tracks background tasks.
#[derive(Clone, Default)]
pub struct TaskRunner {
    tracker: TaskTracker,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` concurrently with the caller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, name: &'static str, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let inner = self.tracker.spawn(async move {
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                tracing::error!(
                    task = name,
                    panic = %panic_message(panic.as_ref()),
                    "Background task panicked",
                );
            }
        });
        TaskHandle { name, inner }
    }

    /// Number of tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every in-flight task, up to `timeout`.
    ///
    /// Returns `true` if all tasks finished in time. Tasks scheduled after
    /// this call are still run and waited for.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let active = self.active();
        if active > 0 {
            tracing::info!(active, "Waiting for background tasks");
        }
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        if !drained {
            tracing::warn!(
                active = self.active(),
                timeout_secs = timeout.as_secs(),
                "Background tasks still running after drain timeout",
            );
        }
        drained
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
