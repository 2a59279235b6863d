//! A custom `Solo` whose subscription is moved onto a dedicated OS thread with
//! `subscribe_on`. The subscriber gets its link right away and requests the value;
//! the request reaches the producer on the worker thread, after it linked.
//!
//! To run this example, execute `cargo run --example subscribe_on_new_thread`.

use std::sync::{mpsc, Arc};

use rxr_solo::{
    scheduler::{NewThreadScheduler, WorkerConfig},
    subscribe::{Link, Subscriber},
    Observer, Solo, Subscribeable,
};

struct PrintingLink;

impl Link for PrintingLink {
    fn request(&self, n: u64) {
        println!(
            "Request for {} received on {:?}",
            n,
            std::thread::current().name()
        );
    }

    fn cancel(&self) {
        println!("Cancelled");
    }
}

fn main() {
    // Runs on the worker thread, not on `main`.
    let solo = Solo::new(|mut o| {
        println!("Subscribed on {:?}", std::thread::current().name());
        o.on_subscribe(Arc::new(PrintingLink));
        o.next(String::from("hello from the worker"));
        o.complete();
    });

    let scheduler =
        NewThreadScheduler::with_config(WorkerConfig::default().thread_name_prefix("demo"));

    let (tx, rx) = mpsc::channel();
    let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
    observer.on_complete(move || {
        println!("Completed");
        let _ = tx.send(());
    });

    // Returns immediately; the subscription itself happens on `demo-1`.
    solo.subscribe_on(scheduler).subscribe(observer);
    println!("Print something while the worker subscribes.");

    // Keep `main` alive until the worker delivered the value.
    let _ = rx.recv();
}
