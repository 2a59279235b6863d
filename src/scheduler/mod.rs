//! Execution contexts on which `Solo` subscriptions run their upstream-facing work.
//!
//! A `Scheduler` hands out `Worker`s. Every worker executes the tasks scheduled on
//! it one at a time, in the order they were scheduled, and can be disposed to drop
//! whatever is still queued. Three schedulers are provided:
//!
//! - [`NewThreadScheduler`] runs each worker on its own OS thread.
//! - [`TokioScheduler`] runs each worker as one task on a Tokio runtime.
//! - [`TestScheduler`] queues tasks until a test drives them explicitly.

mod config;
mod new_thread;
mod task_slot;
mod task_worker;
mod test_scheduler;

pub use config::WorkerConfig;
pub use new_thread::NewThreadScheduler;
pub use task_slot::TaskSlot;
pub use task_worker::TokioScheduler;
pub use test_scheduler::TestScheduler;

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::errors::SchedulerError;

/// Unit of work executed by a `Worker`.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cancellable handle of a scheduled `Task`.
///
/// Disposing the handle before the worker reaches the task prevents it from
/// running. Disposing it later has no effect. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    disposed: Arc<AtomicBool>,
}

impl TaskHandle {
    #[must_use]
    pub fn new() -> Self {
        TaskHandle::default()
    }

    /// A handle whose task will never run, returned when scheduling on a disposed
    /// worker.
    #[must_use]
    pub fn disposed() -> Self {
        TaskHandle {
            disposed: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// A `Task` paired with the handle that can cancel it.
pub(crate) struct ScheduledTask {
    task: Task,
    handle: TaskHandle,
}

impl ScheduledTask {
    pub(crate) fn new(task: Task) -> (Self, TaskHandle) {
        let handle = TaskHandle::new();
        let scheduled = ScheduledTask {
            task,
            handle: handle.clone(),
        };
        (scheduled, handle)
    }

    /// Runs the task unless its handle was disposed.
    pub(crate) fn run(self) {
        if self.handle.is_disposed() {
            return;
        }
        (self.task)();
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Queue entry of channel-backed workers.
pub(crate) enum Message {
    Run(ScheduledTask),
    // Wakes the draining loop so it can exit.
    Shutdown,
}

/// Single-threaded, FIFO, disposable task execution context.
pub trait Worker: Send + Sync {
    /// Queues `task` behind everything already scheduled on this worker.
    ///
    /// On a disposed worker the task is dropped and an already disposed handle is
    /// returned.
    fn schedule(&self, task: Task) -> TaskHandle;

    /// Stops the worker. Queued tasks that have not started are dropped.
    /// Calling it more than once is a no-op.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Factory of `Worker`s.
pub trait Scheduler: Send + Sync {
    /// Creates a worker owned exclusively by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution resources backing the worker cannot be
    /// acquired.
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError>;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError> {
        (**self).create_worker()
    }
}
