use std::io;

use thiserror::Error;

/// Protocol violations detected while coordinating a `Solo` subscription.
#[derive(Debug, Error)]
pub enum SoloError {
    /// A `request` was made with a demand of zero. Demand must be positive.
    #[error("request amount must be positive, got {0}")]
    InvalidDemand(u64),
}

/// Failures of a `Scheduler` to provide a `Worker`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `TokioScheduler` was created outside of a Tokio runtime.
    #[error("Tokio scheduler used outside of Tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The OS thread backing a worker could not be spawned.
    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
