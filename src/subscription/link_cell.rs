//! Single-assignment slot for an upstream `Link`.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        OnceLock,
    },
};

use tracing::{debug, trace, warn};

use crate::subscription::subscribe::LinkHandle;

const EMPTY: u8 = 0;
// A linker won the race out of `EMPTY` and is publishing its handle.
const LINKING: u8 = 1;
const LINKED: u8 = 2;
const CANCELLED: u8 = 3;

/// Result of offering a handle to a `LinkCell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The handle is now the cell's link.
    Stored,
    /// The cell was cancelled first; the handle has been cancelled.
    Cancelled,
    /// Another handle was stored first; the offered one has been cancelled.
    AlreadySet,
}

/// Atomic cell holding the upstream link: `Empty`, `Handle(h)` or `Cancelled`.
///
/// `Empty -> Handle` happens at most once (first writer wins). Cancellation may
/// happen from either state and is terminal. Whichever side loses a race is the
/// one that cancels the handle, so a handle is cancelled exactly once no matter
/// how `set_once` and `cancel` interleave. No operation blocks.
#[derive(Default)]
pub struct LinkCell {
    state: AtomicU8,
    handle: OnceLock<LinkHandle>,
}

impl fmt::Debug for LinkCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.load(Ordering::SeqCst) {
            EMPTY => "Empty",
            LINKING => "Linking",
            LINKED => "Linked",
            _ => "Cancelled",
        };
        f.debug_struct("LinkCell").field("state", &state).finish()
    }
}

impl LinkCell {
    #[must_use]
    pub fn new() -> Self {
        LinkCell {
            state: AtomicU8::new(EMPTY),
            handle: OnceLock::new(),
        }
    }

    /// Stores `link` if the cell is still empty.
    ///
    /// If the cell was cancelled, or already holds a link, `link` is cancelled
    /// instead of being stored.
    pub fn set_once(&self, link: LinkHandle) -> LinkOutcome {
        match self
            .state
            .compare_exchange(EMPTY, LINKING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                if let Err(extra) = self.handle.set(link) {
                    extra.cancel();
                }
                if self
                    .state
                    .compare_exchange(LINKING, LINKED, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    trace!("upstream link stored");
                    return LinkOutcome::Stored;
                }
                // `cancel` ran while the handle was being published and left the
                // disposal to us.
                if let Some(h) = self.handle.get() {
                    h.cancel();
                }
                debug!("link cancelled while being stored");
                LinkOutcome::Cancelled
            }
            Err(CANCELLED) => {
                link.cancel();
                debug!("link arrived after cancellation, cancelled it");
                LinkOutcome::Cancelled
            }
            Err(_) => {
                link.cancel();
                warn!("upstream link set more than once, cancelled the extra link");
                LinkOutcome::AlreadySet
            }
        }
    }

    /// Returns the stored link, or `None` while empty and after cancellation.
    #[must_use]
    pub fn get(&self) -> Option<&LinkHandle> {
        if self.state.load(Ordering::SeqCst) == LINKED {
            self.handle.get()
        } else {
            None
        }
    }

    /// Moves the cell to the terminal cancelled state, cancelling the stored link.
    ///
    /// Returns `true` for the one call that performed the transition; later calls
    /// are no-ops returning `false`.
    pub fn cancel(&self) -> bool {
        match self.state.swap(CANCELLED, Ordering::SeqCst) {
            CANCELLED => false,
            LINKED => {
                if let Some(h) = self.handle.get() {
                    h.cancel();
                }
                trace!("stored link cancelled");
                true
            }
            _ => {
                trace!("link cell cancelled before linkage");
                true
            }
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }
}
