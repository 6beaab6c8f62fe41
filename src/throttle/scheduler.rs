//! One-shot deferred tasks.
//!
//! The dispatcher needs exactly two things from a scheduler: run a task
//! once after a delay, and tell whether that task is still pending. The
//! [`TimerHandle`] returned by [`Scheduler::schedule_once`] answers the
//! second question and can cancel the task before it runs.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::SyncError;

/// Deferred work handed to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Runs tasks once after a delay.
///
/// Implementations must not run the task inline from `schedule_once`: the
/// dispatcher arms timers while holding its own lock.
pub trait Scheduler: Send + Sync {
    fn schedule_once(&self, delay: Duration, task: Task) -> TimerHandle;
}

/// Shared state of one scheduled task.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    state: Arc<AtomicU8>,
}

impl TimerHandle {
    /// A fresh handle in the pending state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    /// Still waiting to run.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    /// Prevent the task from running. Returns false if it already ran or
    /// was already cancelled.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the right to run the task. Scheduler implementations call this
    /// when the delay elapses and run the task only if it returns true.
    pub fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler backed by a tokio runtime (`spawn` + `sleep`).
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context.
    pub fn current() -> Result<Self, SyncError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SyncError::NoRuntime)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TimerHandle {
        let timer = TimerHandle::new();
        let claim = timer.clone();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if claim.try_fire() {
                task();
            }
        });
        timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_handle_transitions() {
        let timer = TimerHandle::new();
        assert!(timer.is_scheduled());
        assert!(timer.try_fire());
        assert!(!timer.is_scheduled());
        assert!(!timer.cancel());
        assert!(!timer.try_fire());
    }

    #[test]
    fn test_cancel_before_fire() {
        let timer = TimerHandle::new();
        assert!(timer.cancel());
        assert!(!timer.is_scheduled());
        assert!(!timer.try_fire());
    }

    #[test]
    fn test_current_without_runtime() {
        assert!(matches!(TokioScheduler::current(), Err(SyncError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_runs_after_delay() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = TokioScheduler::current().unwrap();

        let counter = runs.clone();
        let timer = scheduler.schedule_once(
            Duration::from_millis(50),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(timer.is_scheduled());

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!timer.is_scheduled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancelled_task_never_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = TokioScheduler::current().unwrap();

        let counter = runs.clone();
        let timer = scheduler.schedule_once(
            Duration::from_millis(10),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(timer.cancel());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
