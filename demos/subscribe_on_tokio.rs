//! `Solo::just` subscribed on a Tokio task through `TokioScheduler`. The value is
//! handed back to the async world through a oneshot channel.
//!
//! To run this example, execute `cargo run --example subscribe_on_tokio`.

use std::sync::Mutex;

use rxr_solo::{scheduler::TokioScheduler, subscribe::Subscriber, Solo, Subscribeable};
use tokio::sync::oneshot;

#[tokio::main()]
async fn main() {
    let scheduler = match TokioScheduler::new() {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));

    let mut observer = Subscriber::on_next(move |v: u32| {
        if let Some(tx) = tx.lock().unwrap().take() {
            let _ = tx.send(v);
        }
    });
    observer.on_error(|e| eprintln!("Error: {}", e));

    Solo::just(42).subscribe_on(scheduler).subscribe(observer);

    match rx.await {
        Ok(v) => println!("Emitted {}", v),
        Err(_) => println!("Completed without a value"),
    }
}
