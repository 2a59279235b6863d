use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

use super::{Message, ScheduledTask, Scheduler, Task, TaskHandle, Worker, WorkerConfig};
use crate::errors::SchedulerError;

/// Scheduler that backs every worker with a dedicated OS thread.
///
/// Works without any async runtime. The thread exits as soon as its worker is
/// disposed.
#[derive(Debug, Clone, Default)]
pub struct NewThreadScheduler {
    config: Arc<WorkerConfig>,
    counter: Arc<AtomicUsize>,
}

impl NewThreadScheduler {
    #[must_use]
    pub fn new() -> Self {
        NewThreadScheduler::default()
    }

    #[must_use]
    pub fn with_config(config: WorkerConfig) -> Self {
        NewThreadScheduler {
            config: Arc::new(config),
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Scheduler for NewThreadScheduler {
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let name = self.config.thread_name(n);
        let (tx, rx) = unbounded_channel();

        let mut builder = std::thread::Builder::new().name(name.clone());
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }
        let disposed = Arc::new(AtomicBool::new(false));
        let thread_name = name.clone();
        let thread_disposed = Arc::clone(&disposed);
        builder
            .spawn(move || run_queue(&thread_name, &thread_disposed, rx))
            .map_err(|source| SchedulerError::Spawn {
                name: name.clone(),
                source,
            })?;

        debug!(worker = %name, "worker thread started");
        Ok(Arc::new(NewThreadWorker {
            name,
            sender: tx,
            disposed,
        }))
    }
}

fn run_queue(name: &str, disposed: &AtomicBool, mut rx: UnboundedReceiver<Message>) {
    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(task) if !disposed.load(Ordering::SeqCst) => task.run(),
            Message::Run(_) | Message::Shutdown => break,
        }
    }
    trace!(worker = %name, "worker thread exiting");
}

struct NewThreadWorker {
    name: String,
    sender: UnboundedSender<Message>,
    disposed: Arc<AtomicBool>,
}

impl Worker for NewThreadWorker {
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
        // Wakes the thread so it exits; queued tasks are dropped with the channel.
        let _ = self.sender.send(Message::Shutdown);
        debug!(worker = %self.name, "worker disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
