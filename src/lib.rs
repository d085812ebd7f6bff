//! Пул потоков с приоритетными полосами и ограниченной ёмкостью
//!
//! # Features
//! - Фиксированное число OS-потоков, каждый со стабильным индексом
//! - Три FIFO-полосы (High / Normal / Low) со строгим приоритетом
//! - Контроль допуска: при нехватке ёмкости задача отклоняется, отправитель не блокируется
//! - Результаты и паники задач через `ResultHandle`
//! - Graceful и немедленная остановка
//! - Общий пул процесса через `ThreadPool::global()`
//!
//! ```no_run
//! use lane_pool::{Priority, ThreadPool};
//!
//! let pool = ThreadPool::new(4, 64).unwrap();
//! pool.enqueue_with_priority(|| println!("urgent"), Priority::High);
//!
//! let handle = pool.enqueue_task(|| 2 + 2).expect("pool is full");
//! assert_eq!(handle.get(), Ok(4));
//! ```

pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
mod queue;
mod worker;

pub use errors::{PoolError, SubmitError, TaskError};
pub use handle::{join_handles, ResultHandle};
pub use model::{PoolMetrics, PoolState, Priority};
pub use pool::{Config, ThreadPool};
pub use result::TaskResult;
pub use worker::current_worker_index;
