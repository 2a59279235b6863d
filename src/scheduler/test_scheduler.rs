use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tracing::trace;

use super::{ScheduledTask, Scheduler, Task, TaskHandle, Worker};
use crate::errors::SchedulerError;

/// Scheduler whose workers only run tasks when told to.
///
/// Tasks are queued per worker and executed on the thread that calls
/// [`run_next`](Self::run_next) or [`trigger_actions`](Self::trigger_actions).
/// This makes every interleaving of scheduled work reproducible. Clones share
/// the same workers.
#[derive(Debug, Clone, Default)]
pub struct TestScheduler {
    workers: Arc<Mutex<Vec<Arc<TestWorker>>>>,
}

impl TestScheduler {
    #[must_use]
    pub fn new() -> Self {
        TestScheduler::default()
    }

    fn workers(&self) -> Vec<Arc<TestWorker>> {
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs the oldest queued task of the first worker that has one.
    ///
    /// Returns `false` if nothing was queued.
    pub fn run_next(&self) -> bool {
        for worker in self.workers() {
            if let Some(task) = worker.pop() {
                trace!(worker = worker.id, "test scheduler running task");
                task.run();
                return true;
            }
        }
        false
    }

    /// Runs queued tasks, including those scheduled while running, until every
    /// worker is idle. Returns the number of tasks run.
    pub fn trigger_actions(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Number of tasks waiting in all workers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.workers().iter().map(|w| w.len()).sum()
    }

    #[must_use]
    pub fn workers_created(&self) -> usize {
        self.workers().len()
    }

    /// Number of workers that have been disposed.
    #[must_use]
    pub fn workers_disposed(&self) -> usize {
        self.workers().iter().filter(|w| w.is_disposed()).count()
    }

    /// Total number of `dispose` calls received by all workers, including
    /// repeated calls on the same worker.
    #[must_use]
    pub fn dispose_calls(&self) -> usize {
        self.workers()
            .iter()
            .map(|w| w.dispose_calls.load(Ordering::SeqCst))
            .sum()
    }
}

impl Scheduler for TestScheduler {
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError> {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let worker = Arc::new(TestWorker {
            id: workers.len() + 1,
            queue: Mutex::new(VecDeque::new()),
            disposed: AtomicBool::new(false),
            dispose_calls: AtomicUsize::new(0),
        });
        workers.push(Arc::clone(&worker));
        Ok(worker)
    }
}

#[derive(Debug)]
struct TestWorker {
    id: usize,
    queue: Mutex<VecDeque<ScheduledTask>>,
    disposed: AtomicBool,
    dispose_calls: AtomicUsize,
}

impl TestWorker {
    fn pop(&self) -> Option<ScheduledTask> {
        if self.is_disposed() {
            return None;
        }
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Worker for TestWorker {
    fn schedule(&self, task: Task) -> TaskHandle {
        if self.is_disposed() {
            return TaskHandle::disposed();
        }
        let (task, handle) = ScheduledTask::new(task);
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(task);
        handle
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Queued tasks are dropped after the lock is released.
        let dropped = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        drop(dropped);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
