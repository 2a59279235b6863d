use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::errors::SoloError;
use crate::observer::{BoxedObserver, Observer};
use crate::subscription::{demand, subscribe::Link};

enum Pending {
    Idle,
    Demand,
    Invalid(u64),
}

struct ScalarState<T> {
    value: Option<T>,
    observer: Option<BoxedObserver<T>>,
    pending: Pending,
}

/// Link of `Solo::just`: emits the value on the first valid request.
///
/// The observer is attached after it received the link, so a request made from
/// inside `on_subscribe` is remembered and served by `attach`.
pub(super) struct ScalarLink<T> {
    state: Mutex<ScalarState<T>>,
}

impl<T: Send> ScalarLink<T> {
    pub(super) fn new(value: T) -> Self {
        ScalarLink {
            state: Mutex::new(ScalarState {
                value: Some(value),
                observer: None,
                pending: Pending::Idle,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScalarState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn attach(&self, observer: BoxedObserver<T>) {
        let mut state = self.lock();
        if state.value.is_none() {
            // Cancelled from inside `on_subscribe`.
            return;
        }
        state.observer = Some(observer);
        Self::drain(state);
    }

    // Signals are delivered with the lock released, so the observer may call back
    // into the link.
    fn drain(mut state: MutexGuard<'_, ScalarState<T>>) {
        if state.observer.is_none() || matches!(state.pending, Pending::Idle) {
            return;
        }
        let pending = std::mem::replace(&mut state.pending, Pending::Idle);
        let (Some(mut observer), value) = (state.observer.take(), state.value.take()) else {
            return;
        };
        drop(state);

        match pending {
            Pending::Demand => {
                if let Some(v) = value {
                    trace!("scalar emitting value");
                    observer.next(v);
                    observer.complete();
                }
            }
            Pending::Invalid(n) => observer.error(Arc::new(SoloError::InvalidDemand(n))),
            Pending::Idle => {}
        }
    }
}

impl<T: Send> Link for ScalarLink<T> {
    fn request(&self, n: u64) {
        let mut state = self.lock();
        if demand::is_valid(n) {
            if matches!(state.pending, Pending::Idle) {
                state.pending = Pending::Demand;
            }
        } else {
            state.pending = Pending::Invalid(n);
        }
        Self::drain(state);
    }

    fn cancel(&self) {
        let mut state = self.lock();
        let observer = state.observer.take();
        state.value = None;
        state.pending = Pending::Idle;
        drop(state);
        drop(observer);
    }
}
