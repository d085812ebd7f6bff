#[cfg(test)]
mod tests {
    use lane_pool::{
        errors::SubmitError,
        model::Priority,
        pool::{Config, ThreadPool},
    };
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    fn measure<F, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        println!("✓ {}: {:?}", name, start.elapsed());
        result
    }

    fn wait_idle(pool: &ThreadPool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let m = pool.metrics();
            if m.queued_tasks == 0 && m.active_tasks == 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn load_test_1_many_small_tasks() {
        println!("\n=== LOAD TEST 1: 100k мелких задач ===");
        let pool = ThreadPool::with_config(Config::new(8, 100_000)).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        measure("100k tasks", || {
            for _ in 0..100_000 {
                let counter = counter.clone();
                assert!(pool.enqueue(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }));
            }
            assert!(wait_idle(&pool, Duration::from_secs(30)));
        });

        assert_eq!(counter.load(Ordering::Relaxed), 100_000);
        let metrics = pool.metrics();
        assert_eq!(metrics.completed_tasks, 100_000);
        assert_eq!(metrics.rejected_tasks, 0);
        println!("  Success rate: {:.1}%", metrics.success_rate() * 100.0);
    }

    #[test]
    fn load_test_2_concurrent_producers_with_backpressure() {
        println!("\n=== LOAD TEST 2: 8 продюсеров, ёмкость 64 ===");
        let pool = Arc::new(ThreadPool::new(4, 64).unwrap());
        let executed = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        measure("8 x 5k submissions", || {
            let producers: Vec<_> = (0..8)
                .map(|p| {
                    let pool = pool.clone();
                    let executed = executed.clone();
                    let accepted = accepted.clone();
                    let rejected = rejected.clone();
                    thread::spawn(move || {
                        for i in 0..5_000usize {
                            let priority = match (p + i) % 3 {
                                0 => Priority::High,
                                1 => Priority::Normal,
                                _ => Priority::Low,
                            };
                            let executed = executed.clone();
                            let submitted = pool.try_enqueue(
                                move || {
                                    executed.fetch_add(1, Ordering::Relaxed);
                                },
                                priority,
                            );
                            match submitted {
                                Ok(()) => accepted.fetch_add(1, Ordering::Relaxed),
                                Err(SubmitError::QueueFull { capacity }) => {
                                    assert_eq!(capacity, 64);
                                    rejected.fetch_add(1, Ordering::Relaxed)
                                }
                                Err(SubmitError::Stopped) => panic!("pool stopped unexpectedly"),
                            };
                        }
                    })
                })
                .collect();
            for producer in producers {
                producer.join().unwrap();
            }
            assert!(wait_idle(&pool, Duration::from_secs(30)));
        });

        let accepted = accepted.load(Ordering::Relaxed);
        let rejected = rejected.load(Ordering::Relaxed);
        println!("  Принято: {}, отклонено: {}", accepted, rejected);

        assert_eq!(accepted + rejected, 40_000);
        assert_eq!(executed.load(Ordering::Relaxed), accepted);
        let metrics = pool.metrics();
        assert_eq!(metrics.total_submitted, accepted);
        assert_eq!(metrics.rejected_tasks, rejected);
    }

    #[test]
    fn load_test_3_result_handles_under_load() {
        println!("\n=== LOAD TEST 3: 10k задач с результатом ===");
        let pool = ThreadPool::with_config(Config::io_bound().with_thread_name_prefix("load")).unwrap();
        let batch = pool.capacity() as u64;

        let mut total = 0u64;
        let mut expected = 0u64;
        measure("10k result tasks in batches", || {
            let mut next = 0u64;
            while next < 10_000 {
                let batch_end = (next + batch).min(10_000);
                let handles: Vec<_> = (next..batch_end)
                    .map(|i| pool.enqueue_task(move || i * 2).expect("batch fits capacity"))
                    .collect();
                for handle in handles {
                    total += handle.get().unwrap();
                }
                expected += (next..batch_end).map(|i| i * 2).sum::<u64>();
                next = batch_end;
            }
        });
        assert_eq!(total, expected);
    }

    #[test]
    fn load_test_4_high_priority_overtakes_backlog() {
        println!("\n=== LOAD TEST 4: срочные задачи обгоняют фоновые ===");
        let pool = ThreadPool::new(2, 2_000).unwrap();
        let low_done = Arc::new(AtomicUsize::new(0));

        for _ in 0..1_000 {
            let low_done = low_done.clone();
            assert!(pool.enqueue_with_priority(
                move || {
                    thread::sleep(Duration::from_micros(200));
                    low_done.fetch_add(1, Ordering::SeqCst);
                },
                Priority::Low,
            ));
        }

        let low_seen = low_done.clone();
        let handle = pool
            .enqueue_task_with_priority(move || low_seen.load(Ordering::SeqCst), Priority::High)
            .unwrap();
        let low_before_high = handle.get().unwrap();
        println!("  Low выполнено до High: {}", low_before_high);
        assert!(low_before_high < 1_000);

        assert!(wait_idle(&pool, Duration::from_secs(30)));
        assert_eq!(low_done.load(Ordering::SeqCst), 1_000);
    }
}
