use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tokio::{
    runtime::Handle,
    sync::mpsc::{unbounded_channel, UnboundedSender},
};
use tracing::{debug, trace};

use super::{Message, ScheduledTask, Scheduler, Task, TaskHandle, Worker};
use crate::errors::SchedulerError;

/// Scheduler that backs every worker with one task on a Tokio runtime.
///
/// The runtime is the one current when the scheduler is created, so workers can
/// be created from threads outside of it. Tasks of one worker never overlap even
/// on a multi-threaded runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime_handle: Handle,
    counter: Arc<AtomicUsize>,
}

impl TokioScheduler {
    /// Creates a scheduler bound to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NoRuntime` when called outside of a Tokio runtime.
    pub fn new() -> Result<Self, SchedulerError> {
        let runtime_handle = Handle::try_current()?;
        Ok(Self::with_handle(runtime_handle))
    }

    /// Creates a scheduler bound to the runtime behind `runtime_handle`.
    #[must_use]
    pub fn with_handle(runtime_handle: Handle) -> Self {
        TokioScheduler {
            runtime_handle,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, mut rx) = unbounded_channel();
        let disposed = Arc::new(AtomicBool::new(false));
        let task_disposed = Arc::clone(&disposed);

        self.runtime_handle.spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Run(task) if !task_disposed.load(Ordering::SeqCst) => task.run(),
                    Message::Run(_) | Message::Shutdown => break,
                }
            }
            trace!(worker = id, "worker task exiting");
        });

        debug!(worker = id, "worker task started");
        Ok(Arc::new(TokioWorker {
            id,
            sender: tx,
            disposed,
        }))
    }
}

struct TokioWorker {
    id: usize,
    sender: UnboundedSender<Message>,
    disposed: Arc<AtomicBool>,
}

impl Worker for TokioWorker {
    fn schedule(&self, task: Task) -> TaskHandle {
        if self.is_disposed() {
            return TaskHandle::disposed();
        }
        let (task, handle) = ScheduledTask::new(task);
        if self.sender.send(Message::Run(task)).is_err() {
            handle.dispose();
        }
        handle
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.sender.send(Message::Shutdown);
        debug!(worker = self.id, "worker disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
