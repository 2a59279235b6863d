use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use arc_swap::ArcSwapOption;
use tracing::trace;

use super::TaskHandle;

/// Replaceable holder of the handle of the currently scheduled task.
///
/// Disposing the slot disposes the task it holds and every task placed into it
/// afterwards. All operations are lock-free.
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: ArcSwapOption<TaskHandle>,
    disposed: AtomicBool,
}

impl TaskSlot {
    #[must_use]
    pub fn new() -> Self {
        TaskSlot::default()
    }

    /// Makes `handle` the slot's task without disposing the previous one.
    ///
    /// Returns `false`, after disposing `handle`, if the slot was already
    /// disposed.
    pub fn replace(&self, handle: TaskHandle) -> bool {
        self.current.store(Some(Arc::new(handle.clone())));
        // Pairs with the flag-then-swap order in `dispose`: at least one side
        // sees the other.
        if self.disposed.load(Ordering::SeqCst) {
            handle.dispose();
            self.current.store(None);
            return false;
        }
        true
    }

    /// Disposes the held task. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.current.swap(None) {
            handle.dispose();
            trace!("scheduled task disposed");
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_cancels_current_task() {
        let slot = TaskSlot::new();
        let handle = TaskHandle::new();

        assert!(slot.replace(handle.clone()));
        slot.dispose();

        assert!(slot.is_disposed());
        assert!(handle.is_disposed());
    }

    #[test]
    fn replace_does_not_dispose_previous() {
        let slot = TaskSlot::new();
        let first = TaskHandle::new();
        let second = TaskHandle::new();

        slot.replace(first.clone());
        slot.replace(second.clone());

        assert!(!first.is_disposed());
        slot.dispose();
        assert!(second.is_disposed());
    }

    #[test]
    fn replace_after_dispose_disposes_new_task() {
        let slot = TaskSlot::new();
        slot.dispose();
        slot.dispose();

        let handle = TaskHandle::new();
        assert!(!slot.replace(handle.clone()));
        assert!(handle.is_disposed());
    }
}
