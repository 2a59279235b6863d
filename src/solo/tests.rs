use super::*;

use std::io;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Barrier, Mutex,
};

use proptest::prelude::*;

use crate::errors::{SchedulerError, SoloError};
use crate::scheduler::{TestScheduler, Worker};
use crate::subscription::{
    demand::UNBOUNDED,
    subscribe::{Link, Subscriber},
};

/// Upstream whose linkage and emissions are driven by the test.
#[derive(Default)]
struct Probe {
    subscribes: AtomicUsize,
    observer: Mutex<Option<BoxedObserver<i32>>>,
    requests: Mutex<Vec<u64>>,
    cancels: AtomicUsize,
}

struct ProbeLink(Arc<Probe>);

impl Link for ProbeLink {
    fn request(&self, n: u64) {
        self.0.requests.lock().unwrap().push(n);
    }

    fn cancel(&self) {
        self.0.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

impl Probe {
    fn source(self: &Arc<Self>) -> Solo<i32> {
        let probe = Arc::clone(self);
        Solo::new(move |observer| {
            probe.subscribes.fetch_add(1, Ordering::SeqCst);
            *probe.observer.lock().unwrap() = Some(observer);
        })
    }

    fn with_observer(&self, f: impl FnOnce(&mut BoxedObserver<i32>)) -> bool {
        let taken = self.observer.lock().unwrap().take();
        match taken {
            Some(mut observer) => {
                f(&mut observer);
                *self.observer.lock().unwrap() = Some(observer);
                true
            }
            None => false,
        }
    }

    /// Hands the upstream link to the subscribed observer. Returns `false` if
    /// nothing has subscribed yet.
    fn link(self: &Arc<Self>) -> bool {
        let link = Arc::new(ProbeLink(Arc::clone(self)));
        self.with_observer(|o| o.on_subscribe(link))
    }

    fn emit(&self, v: i32) {
        self.with_observer(|o| {
            o.next(v);
            o.complete();
        });
    }

    fn fail(&self) {
        self.with_observer(|o| o.error(Arc::new(io::Error::new(io::ErrorKind::Other, "probe failed"))));
    }

    fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }
}

/// Downstream that records every signal and keeps its link for the test.
#[derive(Default)]
struct Recorder {
    link: Mutex<Option<LinkHandle>>,
    nexts: Mutex<Vec<i32>>,
    errors: Mutex<Vec<String>>,
    completes: AtomicUsize,
}

impl Recorder {
    fn subscriber(self: &Arc<Self>) -> Subscriber<i32> {
        let (r1, r2, r3, r4) = (
            Arc::clone(self),
            Arc::clone(self),
            Arc::clone(self),
            Arc::clone(self),
        );
        let mut s = Subscriber::new(
            move |v| r1.nexts.lock().unwrap().push(v),
            move |e| r2.errors.lock().unwrap().push(e.to_string()),
            move || {
                r3.completes.fetch_add(1, Ordering::SeqCst);
            },
        );
        s.on_link(move |link| *r4.link.lock().unwrap() = Some(link));
        s
    }

    fn link(&self) -> LinkHandle {
        self.link.lock().unwrap().clone().expect("downstream has no link")
    }

    fn nexts(&self) -> Vec<i32> {
        self.nexts.lock().unwrap().clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

fn setup() -> (TestScheduler, Arc<Probe>, Arc<Recorder>) {
    let scheduler = TestScheduler::new();
    let probe = Arc::new(Probe::default());
    let recorder = Arc::new(Recorder::default());
    probe
        .source()
        .subscribe_on(scheduler.clone())
        .subscribe(recorder.subscriber());
    (scheduler, probe, recorder)
}

#[test]
fn downstream_gets_link_before_upstream_subscribes() {
    let (scheduler, probe, recorder) = setup();

    assert!(recorder.link.lock().unwrap().is_some());
    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.workers_created(), 1);

    assert_eq!(scheduler.trigger_actions(), 1);
    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 1);
}

#[test]
fn request_after_linkage_is_forwarded_on_worker() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    assert!(probe.link());

    recorder.link().request(5);
    // Scheduled, not run inline.
    assert!(probe.requests().is_empty());
    assert_eq!(scheduler.pending(), 1);

    scheduler.trigger_actions();
    assert_eq!(probe.requests(), vec![UNBOUNDED]);
}

#[test]
fn request_before_linkage_is_forwarded_once_after_linkage() {
    let (scheduler, probe, recorder) = setup();

    recorder.link().request(3);
    scheduler.trigger_actions();
    assert!(probe.requests().is_empty());

    assert!(probe.link());
    assert!(probe.requests().is_empty());
    assert_eq!(scheduler.trigger_actions(), 1);
    assert_eq!(probe.requests(), vec![UNBOUNDED]);

    assert_eq!(scheduler.trigger_actions(), 0);
    assert_eq!(probe.requests().len(), 1);
}

#[test]
fn requests_before_linkage_collapse() {
    let (scheduler, probe, recorder) = setup();

    recorder.link().request(1);
    recorder.link().request(2);
    scheduler.trigger_actions();
    probe.link();
    scheduler.trigger_actions();

    assert_eq!(probe.requests(), vec![UNBOUNDED]);
}

#[test]
fn value_is_delivered_and_worker_released() {
    let (scheduler, probe, recorder) = setup();
    recorder.link().request(1);
    scheduler.trigger_actions();
    probe.link();
    scheduler.trigger_actions();

    probe.emit(7);

    assert_eq!(recorder.nexts(), vec![7]);
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.workers_disposed(), 1);

    // Misbehaving upstream and late downstream calls change nothing.
    probe.emit(8);
    probe.fail();
    recorder.link().cancel();
    recorder.link().request(1);

    assert_eq!(recorder.nexts(), vec![7]);
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 1);
    assert!(recorder.errors().is_empty());
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn error_is_forwarded_once_and_worker_released() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();

    probe.fail();
    probe.fail();

    assert_eq!(recorder.errors(), vec!["probe failed".to_owned()]);
    assert!(recorder.nexts().is_empty());
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn cancel_before_subscribe_task_runs() {
    let (scheduler, probe, recorder) = setup();

    recorder.link().cancel();
    recorder.link().cancel();

    assert_eq!(scheduler.trigger_actions(), 0);
    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn cancel_before_linkage_disposes_late_link() {
    let (scheduler, probe, recorder) = setup();
    recorder.link().request(1);
    scheduler.trigger_actions();

    recorder.link().cancel();
    assert!(probe.link());

    assert_eq!(probe.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.trigger_actions(), 0);
    assert!(probe.requests().is_empty());
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn cancel_after_linkage_disposes_link_once() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();
    recorder.link().request(1);

    recorder.link().cancel();
    recorder.link().cancel();
    probe.emit(1);

    assert_eq!(probe.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.trigger_actions(), 0);
    assert!(probe.requests().is_empty());
    assert!(recorder.nexts().is_empty());
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn concurrent_cancels_dispose_once() {
    let threads = 8;
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let link = recorder.link();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                link.cancel();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(probe.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn zero_request_signals_invalid_demand() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();

    recorder.link().request(0);
    scheduler.trigger_actions();
    probe.emit(1);

    assert_eq!(
        recorder.errors(),
        vec!["request amount must be positive, got 0".to_owned()]
    );
    assert!(recorder.nexts().is_empty());
    assert_eq!(probe.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn zero_request_after_value_keeps_completion() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();
    recorder.link().request(1);
    scheduler.trigger_actions();

    probe.with_observer(|o| {
        o.next(7);
        recorder.link().request(0);
        o.complete();
    });
    scheduler.trigger_actions();

    assert_eq!(recorder.nexts(), vec![7]);
    assert!(recorder.errors().is_empty());
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 1);
    assert_eq!(probe.cancels.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn upstream_error_after_value_is_dropped() {
    let (scheduler, probe, recorder) = setup();
    scheduler.trigger_actions();
    probe.link();

    probe.with_observer(|o| o.next(4));
    probe.fail();

    assert_eq!(recorder.nexts(), vec![4]);
    assert!(recorder.errors().is_empty());
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn zero_request_from_next_callback_is_ignored() {
    let scheduler = TestScheduler::new();
    let link = Arc::new(Mutex::new(None::<LinkHandle>));
    let completes = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let (link_c, link_n) = (Arc::clone(&link), Arc::clone(&link));
    let (completes_c, errors_c) = (Arc::clone(&completes), Arc::clone(&errors));

    let mut s = Subscriber::new(
        move |_: i32| {
            if let Some(link) = link_n.lock().unwrap().as_ref() {
                link.request(0);
            }
        },
        move |_| {
            errors_c.fetch_add(1, Ordering::SeqCst);
        },
        move || {
            completes_c.fetch_add(1, Ordering::SeqCst);
        },
    );
    s.on_link(move |l| {
        l.request(1);
        *link_c.lock().unwrap() = Some(l);
    });

    Solo::just(3).subscribe_on(scheduler.clone()).subscribe(s);
    scheduler.trigger_actions();

    assert_eq!(completes.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[test]
fn zero_request_inside_on_subscribe_is_reported() {
    let scheduler = TestScheduler::new();
    let errors = Arc::new(AtomicUsize::new(0));
    let errors_c = Arc::clone(&errors);

    let mut s = Subscriber::on_next(|_: i32| {});
    s.on_error(move |_| {
        errors_c.fetch_add(1, Ordering::SeqCst);
    });
    s.on_link(|link| link.request(0));

    Solo::just(1).subscribe_on(scheduler.clone()).subscribe(s);
    scheduler.trigger_actions();

    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.dispose_calls(), 1);
}

struct FailingScheduler;

impl Scheduler for FailingScheduler {
    fn create_worker(&self) -> Result<Arc<dyn Worker>, SchedulerError> {
        Err(SchedulerError::Spawn {
            name: "failing-1".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "no threads left"),
        })
    }
}

#[test]
fn worker_creation_failure_is_signaled() {
    let probe = Arc::new(Probe::default());
    let recorder = Arc::new(Recorder::default());

    probe
        .source()
        .subscribe_on(FailingScheduler)
        .subscribe(recorder.subscriber());

    assert_eq!(
        recorder.errors(),
        vec!["failed to spawn worker thread `failing-1`".to_owned()]
    );
    assert_eq!(probe.subscribes.load(Ordering::SeqCst), 0);
    recorder.link().request(1);
    recorder.link().cancel();
}

#[test]
fn just_on_test_scheduler() {
    let scheduler = TestScheduler::new();
    let recorder = Arc::new(Recorder::default());

    Solo::just(42)
        .subscribe_on(scheduler.clone())
        .subscribe(recorder.subscriber());
    recorder.link().request(1);
    assert!(recorder.nexts().is_empty());

    scheduler.trigger_actions();
    assert_eq!(recorder.nexts(), vec![42]);
    assert_eq!(recorder.completes.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.workers_disposed(), 1);
}

#[test]
fn error_solo_on_test_scheduler() {
    let scheduler = TestScheduler::new();
    let recorder = Arc::new(Recorder::default());

    Solo::<i32>::error(Arc::new(SoloError::InvalidDemand(9)))
        .subscribe_on(scheduler.clone())
        .subscribe(recorder.subscriber());
    scheduler.trigger_actions();

    assert_eq!(
        recorder.errors(),
        vec!["request amount must be positive, got 9".to_owned()]
    );
    assert_eq!(scheduler.dispose_calls(), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Request(u64),
    Link,
    RunNext,
    Cancel,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u64..10).prop_map(Op::Request),
        2 => Just(Op::Link),
        3 => Just(Op::RunNext),
        1 => Just(Op::Cancel),
    ]
}

proptest! {
    #[test]
    fn interleavings_never_lose_or_duplicate_demand(ops in prop::collection::vec(op(), 0..24)) {
        let (scheduler, probe, recorder) = setup();
        let mut latched = false;
        let mut linked = false;
        let mut cancelled = false;
        let mut link_attempted = false;
        let mut forwards = 0;

        for op in ops {
            match op {
                Op::Request(n) => {
                    recorder.link().request(n);
                    if linked && !cancelled {
                        forwards += 1;
                    } else if !linked {
                        latched = true;
                    }
                }
                Op::Link => {
                    if !link_attempted && probe.link() {
                        link_attempted = true;
                        if !cancelled {
                            linked = true;
                            if latched {
                                latched = false;
                                forwards += 1;
                            }
                        }
                    }
                }
                Op::RunNext => {
                    scheduler.run_next();
                }
                Op::Cancel => {
                    recorder.link().cancel();
                    cancelled = true;
                }
            }
        }

        scheduler.trigger_actions();
        if !link_attempted && probe.link() {
            link_attempted = true;
            if !cancelled {
                linked = true;
                if latched {
                    forwards += 1;
                }
            }
        }
        scheduler.trigger_actions();

        let forwarded = probe.requests();
        prop_assert!(forwarded.iter().all(|&n| n == UNBOUNDED));
        if cancelled {
            prop_assert!(forwarded.len() <= forwards);
            prop_assert_eq!(scheduler.dispose_calls(), 1);
            prop_assert_eq!(probe.cancels.load(Ordering::SeqCst), usize::from(link_attempted));
        } else {
            prop_assert_eq!(forwarded.len(), forwards);
            prop_assert_eq!(scheduler.dispose_calls(), 0);
            prop_assert_eq!(probe.cancels.load(Ordering::SeqCst), 0);
            prop_assert!(linked);
        }
    }
}
