//! The `solo` module provides `Solo`, a producer of exactly one value or one error,
//! and the `subscribe_on` operator that moves its subscription onto a `Worker`.

mod scalar;
mod subscribe_on;

use std::{error::Error, fmt, sync::Arc};

use tracing::trace;

use crate::observer::{BoxedObserver, Observer};
use crate::scheduler::Scheduler;
use crate::subscription::subscribe::{EmptyLink, LinkHandle, Subscribeable};

use scalar::ScalarLink;

type SubscribeFn<T> = dyn Fn(BoxedObserver<T>) + Send + Sync;

/// The `Solo` struct represents a cold source of a single value or an error.
///
/// Subscribing runs the producer's subscribe function with the given observer. The
/// function must first hand the observer a `Link` through `on_subscribe`, then
/// signal at most once: `next` followed by `complete`, or `error`. Nothing may be
/// signaled after that, or after the link was cancelled.
///
/// `Solo` is cheap to clone; clones share the subscribe function.
///
/// # Example: value delivered on a worker thread
///
/// ```no_run
/// use std::sync::mpsc;
///
/// use rxr_solo::scheduler::NewThreadScheduler;
/// use rxr_solo::subscribe::Subscriber;
/// use rxr_solo::{Solo, Subscribeable};
///
/// let (tx, rx) = mpsc::channel();
///
/// // The subscription to `just` and the request for its value both happen on the
/// // worker thread; `subscribe` returns right away.
/// Solo::just(42)
///     .subscribe_on(NewThreadScheduler::new())
///     .subscribe(Subscriber::new(
///         move |v| tx.send(v).unwrap(),
///         |e| eprintln!("Error: {}", e),
///         || println!("Completed"),
///     ));
///
/// assert_eq!(rx.recv().unwrap(), 42);
/// ```
///
/// # Example: custom producer
///
/// ```no_run
/// use std::sync::Arc;
///
/// use rxr_solo::subscribe::{Link, Subscriber};
/// use rxr_solo::{Observer, Solo, Subscribeable};
///
/// struct Noop;
///
/// impl Link for Noop {
///     fn request(&self, _: u64) {}
///     fn cancel(&self) {}
/// }
///
/// let answer = Solo::new(|mut observer| {
///     observer.on_subscribe(Arc::new(Noop));
///     observer.next(String::from("answer"));
///     observer.complete();
/// });
///
/// answer.subscribe(Subscriber::on_next(|v| println!("Emitted {}", v)));
/// ```
pub struct Solo<T> {
    subscribe_fn: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Solo<T> {
    fn clone(&self) -> Self {
        Solo {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
        }
    }
}

impl<T> fmt::Debug for Solo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solo").finish_non_exhaustive()
    }
}

impl<T: 'static> Solo<T> {
    /// Creates a `Solo` from a subscribe function.
    ///
    /// The function is called once per subscription, on the subscribing thread,
    /// with the observer to signal.
    pub fn new(sf: impl Fn(BoxedObserver<T>) + Send + Sync + 'static) -> Self {
        Solo {
            subscribe_fn: Arc::new(sf),
        }
    }

    /// Emits `value` and completes once the observer requests it.
    ///
    /// Every subscription receives its own clone of `value`. A zero request is
    /// reported to the observer as `SoloError::InvalidDemand`.
    pub fn just(value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Solo::new(move |mut observer| {
            let link = Arc::new(ScalarLink::new(value.clone()));
            observer.on_subscribe(Arc::clone(&link) as LinkHandle);
            link.attach(observer);
        })
    }

    /// Signals `error` right after subscription, without waiting for demand.
    pub fn error(error: Arc<dyn Error + Send + Sync>) -> Self {
        Solo::new(move |mut observer| {
            observer.on_subscribe(Arc::new(EmptyLink));
            trace!("solo signaling error");
            observer.error(Arc::clone(&error));
        })
    }

    /// Subscribes to this `Solo` on a worker of `scheduler`.
    ///
    /// Subscribing to the returned `Solo` hands the observer its `Link` at once
    /// and returns. The subscription to `self` then happens on a fresh worker,
    /// and every request made through the link, before or after that, is
    /// forwarded upstream on the same worker. The worker is released when the
    /// value or error has been delivered, or when the link is cancelled.
    ///
    /// If `scheduler` fails to provide a worker the observer receives the
    /// `SchedulerError`.
    pub fn subscribe_on<S>(self, scheduler: S) -> Solo<T>
    where
        S: Scheduler + 'static,
        T: Send,
    {
        Solo::new(move |observer| {
            subscribe_on::subscribe_actual(&self, &scheduler, observer);
        })
    }
}

impl<T: 'static> Subscribeable for Solo<T> {
    type ObsType = T;

    fn subscribe<O>(&self, observer: O)
    where
        O: Observer<NextFnType = T> + Send + 'static,
    {
        (self.subscribe_fn)(Box::new(observer));
    }
}

#[cfg(test)]
mod tests;
