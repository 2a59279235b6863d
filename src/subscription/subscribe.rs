use std::{error::Error, fmt, sync::Arc};

use crate::observer::Observer;
use crate::subscription::demand::UNBOUNDED;

/// Handle through which a consumer asks its producer for the value, or tells it
/// to stop.
///
/// Both methods may be called from any thread, any number of times, before or
/// after the producer terminated. Calls after termination are no-ops.
pub trait Link: Send + Sync {
    /// Signals demand for `n` values. `n` must be positive; a zero demand is a
    /// protocol violation and is reported to the consumer as an error.
    fn request(&self, n: u64);

    /// Stops the producer and releases its resources. Idempotent.
    fn cancel(&self);
}

/// Shared, type-erased `Link`.
pub type LinkHandle = Arc<dyn Link>;

/// A `Link` that ignores every call.
///
/// Handed out by producers that terminate without needing demand, like
/// `Solo::error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyLink;

impl Link for EmptyLink {
    fn request(&self, _: u64) {}

    fn cancel(&self) {}
}

/// A trait for types that can be subscribed to, allowing consumers to receive the
/// value or error emitted by a single-value producer.
pub trait Subscribeable {
    /// The type of the value emitted.
    type ObsType;

    /// Attaches `observer` to this producer.
    ///
    /// The observer first receives a `Link` through `Observer::on_subscribe`,
    /// which it uses to request the value or to cancel.
    fn subscribe<O>(&self, observer: O)
    where
        O: Observer<NextFnType = Self::ObsType> + Send + 'static;
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(Arc<dyn Error + Send + Sync>) + Send>;
type SubscribeFn = Box<dyn FnMut(LinkHandle) + Send>;

/// A type that acts as an observer, allowing users to handle the emitted value,
/// an error, and completion when subscribing to a `Solo`.
///
/// Unless a custom `on_link` function is provided, the `Subscriber` requests
/// unbounded demand as soon as it receives its `Link`.
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
    subscribe_fn: Option<SubscribeFn>,
    completed: bool,
    errored: bool,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for the
    /// emitted value, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
            subscribe_fn: None,
            completed: false,
            errored: false,
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
            subscribe_fn: None,
            completed: false,
            errored: false,
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(&mut self, error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send) {
        self.error_fn = Some(Box::new(error_fn));
    }

    /// Replace the default subscribe behavior.
    ///
    /// The closure receives the producer's `Link` and becomes responsible for
    /// calling `request`, now or later, from any thread. Without it the
    /// `Subscriber` requests unbounded demand immediately.
    pub fn on_link(&mut self, subscribe_fn: impl FnMut(LinkHandle) + 'static + Send) {
        self.subscribe_fn = Some(Box::new(subscribe_fn));
    }

    /// Returns `true` once `complete` or `error` has been delivered.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.completed || self.errored
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("completed", &self.completed)
            .field("errored", &self.errored)
            .finish_non_exhaustive()
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn on_subscribe(&mut self, link: LinkHandle) {
        match &mut self.subscribe_fn {
            Some(sfn) => (sfn)(link),
            None => link.request(UNBOUNDED),
        }
    }

    fn next(&mut self, v: Self::NextFnType) {
        if self.is_terminated() {
            return;
        }
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.completed = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
    }

    fn error(&mut self, observable_error: Arc<dyn Error + Send + Sync>) {
        if self.is_terminated() {
            return;
        }
        self.errored = true;
        if let Some(efn) = &mut self.error_fn {
            (efn)(observable_error);
        }
    }
}
