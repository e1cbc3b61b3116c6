use std::time::Instant;
use tokio::time::Duration;
use tracing::instrument::WithSubscriber;

use tracing_log_capture::init::{init_global, EngineConfig};
use tracing_log_capture::LogCaptor;

#[tokio::main]
async fn main() {
    let config = EngineConfig::default().without_console();
    let _engine = init_global(config).expect("install capture engine");

    let captor = LogCaptor::for_module("capture_demo::jobs").expect("captor");
    captor.set_level_to_info();

    let n: u64 = 10_000;
    let start = Instant::now();

    let mut tasks = Vec::new();
    for worker in 0..4u64 {
        let task = async move {
            for i in 0..n / 4 {
                tracing_log_capture::info!(target: "capture_demo::jobs", "worker {} finished job {}", worker, i);
                tracing::debug!(target: "capture_demo::jobs", "not captured");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        };
        tasks.push(tokio::spawn(task.with_current_subscriber()));
    }
    for task in tasks {
        task.await.expect("worker");
    }

    let elapsed = start.elapsed();
    println!(
        "captured {} of {} events in {:?} (~{:.0} ev/s)",
        captor.info_logs().len(),
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let last = captor.events().pop().expect("at least one event");
    println!("last template: {:?}, arguments: {:?}", last.template(), last.arguments());

    captor.close();
    captor.reset_level();
}
