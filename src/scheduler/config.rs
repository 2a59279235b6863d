//! Worker configuration

/// Settings applied to the OS threads of a `NewThreadScheduler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Worker threads are named `{thread_name_prefix}-{n}`.
    pub thread_name_prefix: String,

    /// Stack size of worker threads in bytes. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

fn default_thread_name_prefix() -> String {
    "rxr-solo-worker".to_owned()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Name of the `n`th worker thread.
    pub(crate) fn thread_name(&self, n: usize) -> String {
        format!("{}-{n}", self.thread_name_prefix)
    }
}
