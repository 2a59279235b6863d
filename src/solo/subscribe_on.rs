//! Subscribe to the upstream `Solo` on a worker of a scheduler.
//!
//! Downstream receives its `Link` immediately, while the subscription to upstream
//! is queued on the worker. Requests arriving before upstream handed over its own
//! link are latched and forwarded, on the worker, once that link is stored. All
//! coordination state is atomic: `request` and `cancel` never block their caller.

use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use tracing::{debug, trace, warn};

use super::Solo;
use crate::errors::SoloError;
use crate::observer::{BoxedObserver, Observer};
use crate::scheduler::{Scheduler, TaskSlot, Worker};
use crate::subscription::{
    demand::{self, DemandLatch, UNBOUNDED},
    link_cell::{LinkCell, LinkOutcome},
    subscribe::{EmptyLink, Link, LinkHandle, Subscribeable},
};

pub(super) fn subscribe_actual<T, S>(
    source: &Solo<T>,
    scheduler: &S,
    mut downstream: BoxedObserver<T>,
) where
    T: Send + 'static,
    S: Scheduler + ?Sized,
{
    let worker = match scheduler.create_worker() {
        Ok(worker) => worker,
        Err(e) => {
            warn!(error = %e, "subscribe_on could not create a worker");
            downstream.on_subscribe(Arc::new(EmptyLink));
            downstream.error(Arc::new(e));
            return;
        }
    };

    let parent = SubscribeOn::new(source.clone(), worker);
    downstream.on_subscribe(Arc::clone(&parent) as LinkHandle);
    parent.attach(downstream);

    let this = Arc::clone(&parent);
    let task = parent.worker.schedule(Box::new(move || {
        trace!("subscribing to upstream on worker");
        let upstream = this.source.clone();
        upstream.subscribe(SubscribeOnObserver(this));
    }));
    parent.task.replace(task);
    debug!("upstream subscription scheduled");
}

// Delivery states of the downstream observer. Transitions only move forward.
const ACTIVE: u8 = 0;
const VALUE_SENT: u8 = 1;
const TERMINATED: u8 = 2;

struct Downstream<T> {
    observer: Option<BoxedObserver<T>>,
    // Invalid-demand error raised before the observer was attached.
    parked_error: Option<Arc<dyn Error + Send + Sync>>,
}

struct SubscribeOn<T> {
    this: Weak<SubscribeOn<T>>,
    source: Solo<T>,
    worker: Arc<dyn Worker>,
    downstream: Mutex<Downstream<T>>,
    link: LinkCell,
    requested: DemandLatch,
    task: TaskSlot,
    // One of `ACTIVE`, `VALUE_SENT` or `TERMINATED`.
    state: AtomicU8,
    worker_released: AtomicBool,
}

impl<T: Send + 'static> SubscribeOn<T> {
    fn new(source: Solo<T>, worker: Arc<dyn Worker>) -> Arc<Self> {
        Arc::new_cyclic(|this| SubscribeOn {
            this: this.clone(),
            source,
            worker,
            downstream: Mutex::new(Downstream {
                observer: None,
                parked_error: None,
            }),
            link: LinkCell::new(),
            requested: DemandLatch::new(),
            task: TaskSlot::new(),
            state: AtomicU8::new(ACTIVE),
            worker_released: AtomicBool::new(false),
        })
    }

    fn downstream(&self) -> MutexGuard<'_, Downstream<T>> {
        self.downstream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, mut observer: BoxedObserver<T>) {
        let mut downstream = self.downstream();
        if let Some(e) = downstream.parked_error.take() {
            drop(downstream);
            observer.error(e);
            return;
        }
        downstream.observer = Some(observer);
    }

    fn on_upstream_linked(&self, link: LinkHandle) {
        if self.link.set_once(link) == LinkOutcome::Stored && self.requested.take() {
            self.schedule_request();
        }
    }

    fn schedule_request(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        self.worker.schedule(Box::new(move || {
            if let Some(link) = this.link.get() {
                trace!("forwarding request upstream");
                link.request(UNBOUNDED);
            }
        }));
    }

    // Moves to `TERMINATED` and returns the state it left, or `None` if another
    // caller already terminated.
    fn terminate(&self) -> Option<u8> {
        match self.state.swap(TERMINATED, Ordering::SeqCst) {
            TERMINATED => None,
            prev => Some(prev),
        }
    }

    fn release_worker(&self) {
        if !self.worker_released.swap(true, Ordering::SeqCst) {
            self.worker.dispose();
            trace!("subscribe_on worker released");
        }
    }

    fn on_value(&self, v: T) {
        if self.link.is_cancelled()
            || self
                .state
                .compare_exchange(ACTIVE, VALUE_SENT, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return;
        }
        if let Some(observer) = self.downstream().observer.as_mut() {
            observer.next(v);
        }
    }

    fn on_error(&self, e: Arc<dyn Error + Send + Sync>) {
        if self.link.is_cancelled() {
            return;
        }
        match self.terminate() {
            None => return,
            Some(VALUE_SENT) => warn!(error = %e, "upstream error after its value dropped"),
            Some(_) => {
                if let Some(observer) = self.downstream().observer.as_mut() {
                    observer.error(e);
                }
            }
        }
        self.release_worker();
    }

    fn on_complete(&self) {
        if self.link.is_cancelled() || self.terminate().is_none() {
            return;
        }
        if let Some(observer) = self.downstream().observer.as_mut() {
            observer.complete();
        }
        self.release_worker();
    }

    // Zero demand terminates the subscription with an error, unless the value
    // already went downstream, in which case upstream's completion still does.
    // The error is delivered from the worker so a `request(0)` issued inside a
    // downstream callback cannot re-enter the downstream lock.
    fn reject_demand(&self, n: u64) {
        if self.link.is_cancelled()
            || self
                .state
                .compare_exchange(ACTIVE, TERMINATED, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            debug!(n, "invalid request amount ignored after delivery");
            return;
        }
        warn!(n, "invalid request amount");
        self.link.cancel();
        self.task.dispose();

        let Some(this) = self.this.upgrade() else {
            return;
        };
        let handle = self.worker.schedule(Box::new(move || {
            let e: Arc<dyn Error + Send + Sync> = Arc::new(SoloError::InvalidDemand(n));
            let mut downstream = this.downstream();
            match downstream.observer.as_mut() {
                Some(observer) => observer.error(e),
                None => downstream.parked_error = Some(e),
            }
            drop(downstream);
            this.release_worker();
        }));
        if handle.is_disposed() {
            self.release_worker();
        }
    }
}

impl<T: Send + 'static> Link for SubscribeOn<T> {
    fn request(&self, n: u64) {
        if !demand::is_valid(n) {
            self.reject_demand(n);
            return;
        }
        if self.link.get().is_some() {
            self.schedule_request();
            return;
        }
        self.requested.set();
        // Upstream may have linked between the check above and the latch.
        if self.link.get().is_some() && self.requested.take() {
            self.schedule_request();
        }
    }

    fn cancel(&self) {
        if self.link.cancel() {
            debug!("subscribe_on cancelled");
        }
        self.task.dispose();
        self.release_worker();
    }
}

/// Upstream-facing side of `SubscribeOn`.
struct SubscribeOnObserver<T>(Arc<SubscribeOn<T>>);

impl<T: Send + 'static> Observer for SubscribeOnObserver<T> {
    type NextFnType = T;

    fn on_subscribe(&mut self, link: LinkHandle) {
        self.0.on_upstream_linked(link);
    }

    fn next(&mut self, v: T) {
        self.0.on_value(v);
    }

    fn complete(&mut self) {
        self.0.on_complete();
    }

    fn error(&mut self, e: Arc<dyn Error + Send + Sync>) {
        self.0.on_error(e);
    }
}
