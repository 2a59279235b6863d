use std::sync::{mpsc, Arc, Mutex, Once};
use std::time::Duration;

use rxr_solo::subscribe::{LinkHandle, Subscriber};

/// Signals observed by one subscriber, plus the link it received.
#[derive(Default)]
pub struct Emissions {
    pub nexts: Mutex<Vec<i32>>,
    pub completes: Mutex<Vec<i32>>,
    pub errors: Mutex<Vec<String>>,
    pub link: Mutex<Option<LinkHandle>>,
}

impl Emissions {
    pub fn link(&self) -> LinkHandle {
        self.link.lock().unwrap().clone().expect("no link received")
    }
}

/// Routes library logs to the test output. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builds a subscriber that records into the returned `Emissions` and sends `()`
/// on the returned channel when it terminates.
///
/// With `auto_request` the subscriber requests as soon as it gets its link,
/// otherwise the test requests through `Emissions::link`.
pub fn register_emissions_subscriber(
    auto_request: bool,
) -> (Subscriber<i32>, Arc<Emissions>, mpsc::Receiver<()>) {
    init_tracing();
    let emissions = Arc::new(Emissions::default());
    let (tx, rx) = mpsc::channel();
    let tx_err = tx.clone();

    let nexts_c = Arc::clone(&emissions);
    let errors_c = Arc::clone(&emissions);
    let completes_c = Arc::clone(&emissions);
    let link_c = Arc::clone(&emissions);

    let mut subscriber = Subscriber::new(
        move |n| {
            // Track next() calls.
            nexts_c.nexts.lock().unwrap().push(n);
        },
        move |e| {
            // Track error() calls.
            errors_c.errors.lock().unwrap().push(e.to_string());
            let _ = tx_err.send(());
        },
        move || {
            // Track complete() calls.
            completes_c.completes.lock().unwrap().push(1);
            let _ = tx.send(());
        },
    );
    subscriber.on_link(move |link| {
        if auto_request {
            link.request(1);
        }
        *link_c.link.lock().unwrap() = Some(link);
    });
    (subscriber, emissions, rx)
}

pub fn await_termination(rx: &mpsc::Receiver<()>) {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("subscriber did not terminate in time");
}
