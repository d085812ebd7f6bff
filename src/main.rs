use lane_pool::{Priority, ThreadPool};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let now = Instant::now();
    let pool = ThreadPool::global();

    let mut accepted = 0usize;
    let mut rejected = 0usize;
    for i in 0..100_000u64 {
        let priority = match i % 3 {
            0 => Priority::High,
            1 => Priority::Normal,
            _ => Priority::Low,
        };
        if pool.enqueue_with_priority(
            move || {
                let _a = i;
            },
            priority,
        ) {
            accepted += 1;
        } else {
            rejected += 1;
        }
    }

    let handle = pool.enqueue_task(|| (0..1_000u64).sum::<u64>());
    while pool.total_pending_tasks() > 0 {
        std::thread::sleep(Duration::from_millis(1));
    }
    if let Some(handle) = handle {
        println!("sum: {:?}", handle.get());
    }

    let metrics = pool.metrics();
    println!(
        "accepted: {}, rejected: {}, completed: {}, elapsed: {:?}",
        accepted, rejected, metrics.completed_tasks, now.elapsed()
    );
}
