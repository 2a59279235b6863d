//! `rxr-solo` provides single-value reactive producers and a race-free way of moving
//! their subscription onto a chosen execution context.
//!
//! A [`Solo`] emits exactly one value followed by completion, or one error. Its
//! consumers are [`Observer`]s: they first receive a [`Link`] through which they
//! request the value or cancel, then at most one terminal signal.
//!
//! [`Solo::subscribe_on`] defers the subscription to the upstream `Solo` onto a
//! [`Worker`] obtained from a [`Scheduler`]. The consumer gets its `Link`
//! immediately and may request or cancel from any thread, before, during or after
//! the upstream subscription happens. Every request reaches upstream exactly once,
//! on the worker, after upstream linked; cancellation releases the upstream link,
//! the pending subscribe task and the worker.
//!
//! Library activity is reported through [`tracing`]; install a subscriber to see it.
//!
//! [`Link`]: subscribe::Link
//! [`Worker`]: scheduler::Worker
//! [`Scheduler`]: scheduler::Scheduler

mod errors;
mod observer;
pub mod scheduler;
mod solo;
mod subscription;

pub use crate::subscription::{demand, link_cell, subscribe};
pub use errors::*;
pub use observer::{BoxedObserver, Observer};
pub use solo::Solo;
pub use subscribe::Subscribeable;
