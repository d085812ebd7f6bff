use super::{
    errors::{PoolError, SubmitError},
    handle::{Detached, ResultHandle, Task, WithResult},
    model::{PoolMetrics, PoolState, Priority},
    queue::QueueSet,
    worker,
};
use parking_lot::{Condvar, Mutex};
use std::{
    fmt,
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
};
use tracing::{debug, error, info, trace, warn};

/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    /// Максимум задач в очереди + выполняющихся
    pub capacity: usize,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus,
            capacity: num_cpus * 20,
            thread_name_prefix: "lane-worker".to_string(),
        }
    }
}

impl Config {
    pub fn new(num_threads: usize, capacity: usize) -> Self {
        Self {
            num_threads,
            capacity,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus,
            capacity: num_cpus * 10,
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus * 2,
            capacity: num_cpus * 64,
            ..Default::default()
        }
    }

    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.num_threads == 0 {
            return Err(PoolError::invalid_config("num_threads must be at least 1"));
        }
        if self.capacity == 0 {
            return Err(PoolError::invalid_config("capacity must be at least 1"));
        }
        if self.capacity < self.num_threads {
            return Err(PoolError::invalid_config(format!(
                "capacity ({}) must not be smaller than num_threads ({})",
                self.capacity, self.num_threads
            )));
        }
        Ok(())
    }
}

/// Состояние, общее для контроллера и воркеров
pub(crate) struct Shared {
    pub queue: Mutex<QueueSet>,
    pub available: Condvar,
}

/// Пул с фиксированным числом потоков, тремя полосами приоритета и
/// ограниченной ёмкостью.
///
/// Задачи не блокируют отправителя: при нехватке ёмкости или после
/// остановки `enqueue` сразу возвращает `false`. `Drop` вызывает `stop()`,
/// уже принятые задачи при этом выполняются до конца.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: Config,
}

static GLOBAL: OnceLock<ThreadPool> = OnceLock::new();

impl ThreadPool {
    pub fn new(num_threads: usize, capacity: usize) -> Result<Self, PoolError> {
        Self::with_config(Config::new(num_threads, capacity))
    }

    pub fn with_config(config: Config) -> Result<Self, PoolError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(QueueSet::new(config.capacity, config.num_threads)),
            available: Condvar::new(),
        });

        let pool = ThreadPool {
            shared,
            workers: Mutex::new(Vec::with_capacity(config.num_threads)),
            config,
        };

        // Запускаем воркеры
        for index in 0..pool.config.num_threads {
            let shared = pool.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", pool.config.thread_name_prefix, index))
                .spawn(move || worker::worker_loop(index, shared));

            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    error!(worker = index, error = %e, "failed to spawn worker thread");
                    // недостартовавшие воркеры не выйдут сами
                    {
                        let mut queue = pool.shared.queue.lock();
                        for _ in index..pool.config.num_threads {
                            queue.worker_exited();
                        }
                    }
                    pool.stop();
                    return Err(PoolError::ThreadSpawn(e));
                }
            }
        }

        info!(
            workers = pool.config.num_threads,
            capacity = pool.config.capacity,
            "thread pool started"
        );
        Ok(pool)
    }

    /// Общий пул процесса, создаётся при первом обращении с `Config::default()`
    /// и живёт до конца процесса. Тестам, которым нужна изоляция, лучше
    /// строить собственный пул.
    ///
    /// # Panics
    ///
    /// Если ОС не дала создать потоки воркеров.
    pub fn global() -> &'static ThreadPool {
        GLOBAL.get_or_init(|| {
            ThreadPool::with_config(Config::default().with_thread_name_prefix("lane-global"))
                .expect("failed to start the global thread pool")
        })
    }

    #[inline]
    pub fn get_instance() -> &'static ThreadPool {
        Self::global()
    }

    /// Индекс воркера, выполняющего вызывающую задачу
    #[inline]
    pub fn current_worker_index() -> Option<usize> {
        worker::current_worker_index()
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.config.num_threads
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Задачи в очереди, ещё не взятые воркерами (выполняющиеся не считаются)
    pub fn total_pending_tasks(&self) -> usize {
        self.shared.queue.lock().queued()
    }

    pub fn state(&self) -> PoolState {
        self.shared.queue.lock().state()
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.queue.lock().metrics(self.config.num_threads)
    }

    pub fn enqueue<F>(&self, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_with_priority(f, Priority::Normal)
    }

    /// Паника внутри такой задачи логируется и отбрасывается
    pub fn enqueue_with_priority<F>(&self, f: F, priority: Priority) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.try_enqueue(f, priority).is_ok()
    }

    pub fn try_enqueue<F>(&self, f: F, priority: Priority) -> Result<(), SubmitError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Detached::boxed(f), priority)
    }

    pub fn enqueue_task<F, T>(&self, f: F) -> Option<ResultHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.enqueue_task_with_priority(f, Priority::Normal)
    }

    pub fn enqueue_task_with_priority<F, T>(&self, f: F, priority: Priority) -> Option<ResultHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.try_enqueue_task(f, priority).ok()
    }

    pub fn try_enqueue_task<F, T>(&self, f: F, priority: Priority) -> Result<ResultHandle<T>, SubmitError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (task, handle) = WithResult::pair(f);
        self.submit(task, priority)?;
        Ok(handle)
    }

    fn submit(&self, task: Task, priority: Priority) -> Result<(), SubmitError> {
        let mut queue = self.shared.queue.lock();
        if let Err(e) = queue.check_admission() {
            drop(queue);
            debug!(error = %e, %priority, "task rejected");
            // задача дропается уже без блокировки
            return Err(e);
        }
        let seq = queue.push(task, priority);
        let wake = queue.idle_workers() > 0;
        drop(queue);

        trace!(seq, %priority, "task admitted");
        if wake {
            self.shared.available.notify_one();
        }
        Ok(())
    }

    /// Останавливает приём задач и дожидается воркеров. Уже принятые
    /// задачи выполняются до конца.
    ///
    /// Вызов изнутри задачи этого же пула не ждёт собственный поток.
    pub fn stop(&self) {
        if self.shared.queue.lock().begin_shutdown() {
            info!("thread pool shutting down");
        }
        self.shared.available.notify_all();
        self.join_workers();
    }

    /// Как `stop`, но задачи, которые ещё не начали выполняться,
    /// отбрасываются; их handles получают `TaskError::PoolStopped`.
    pub fn stop_now(&self) {
        let abandoned = {
            let mut queue = self.shared.queue.lock();
            if queue.begin_shutdown() {
                info!("thread pool shutting down, discarding queued tasks");
            }
            queue.drain()
        };
        self.shared.available.notify_all();

        if !abandoned.is_empty() {
            debug!(count = abandoned.len(), "abandoning queued tasks");
        }
        for entry in abandoned {
            entry.task.abandon();
        }
        self.join_workers();
    }

    fn join_workers(&self) {
        let handles = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();

        for handle in handles {
            if handle.thread().id() == current {
                warn!("stop() called from a worker of this pool, not joining own thread");
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread panicked outside of a task");
            }
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("workers", &self.config.num_threads)
            .field("capacity", &self.config.capacity)
            .field("state", &self.state())
            .finish()
    }
}
