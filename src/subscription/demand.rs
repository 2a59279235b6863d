//! Demand values and the latch that remembers demand arriving before the upstream
//! link exists.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

/// Demand large enough to never run out. Single-value producers treat any
/// positive demand the same way, so forwarded demand is collapsed to this.
pub const UNBOUNDED: u64 = u64::MAX;

/// Returns `true` if `n` is a valid demand, i.e. positive.
#[must_use]
pub const fn is_valid(n: u64) -> bool {
    n > 0
}

/// Records that downstream asked for the value before upstream linkage existed.
///
/// The latch is set by a requester and consumed at most once per set by whoever
/// observes it first with `take`, so a demand recorded here is forwarded exactly
/// once.
#[derive(Debug, Default)]
pub struct DemandLatch {
    requested: AtomicBool,
}

impl DemandLatch {
    #[must_use]
    pub const fn new() -> Self {
        DemandLatch {
            requested: AtomicBool::new(false),
        }
    }

    /// Marks demand as pending.
    pub fn set(&self) {
        self.requested.store(true, Ordering::SeqCst);
        trace!("demand latched");
    }

    /// Clears the latch, returning `true` if demand was pending.
    ///
    /// Only one of any number of concurrent callers observes `true`.
    pub fn take(&self) -> bool {
        let pending = self.requested.swap(false, Ordering::SeqCst);
        if pending {
            trace!("latched demand consumed");
        }
        pending
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
