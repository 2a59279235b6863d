use std::{error::Error, sync::Arc};

use crate::subscription::subscribe::LinkHandle;

/// Receiver of the signals of a single-value producer.
///
/// The producer calls `on_subscribe` exactly once, before anything else, handing
/// over the `Link` used to request the value or to cancel. It then signals at most
/// one terminal event: `next` followed by `complete`, or `error`.
pub trait Observer {
    type NextFnType;

    fn on_subscribe(&mut self, link: LinkHandle);
    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: Arc<dyn Error + Send + Sync>);
}

/// Owned observer trait object, as handed to `Solo` subscribe functions.
pub type BoxedObserver<T> = Box<dyn Observer<NextFnType = T> + Send>;

impl<T> Observer for BoxedObserver<T> {
    type NextFnType = T;

    fn on_subscribe(&mut self, link: LinkHandle) {
        (**self).on_subscribe(link);
    }

    fn next(&mut self, v: T) {
        (**self).next(v);
    }

    fn complete(&mut self) {
        (**self).complete();
    }

    fn error(&mut self, e: Arc<dyn Error + Send + Sync>) {
        (**self).error(e);
    }
}
