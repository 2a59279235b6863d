//! Error types signaled to observers by `Solo` producers and schedulers.
//!
//! Observers receive errors as `Arc<dyn Error + Send + Sync>`, so every type in
//! this module can be wrapped in an `Arc` and passed to `Observer::error`.

mod solo_errors;

pub use solo_errors::*;
