use thiserror::Error;

/// Ошибка построения пула
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl PoolError {
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        PoolError::InvalidConfig(msg.into())
    }
}

/// Причина отказа в приёме задачи
#[derive(Debug, PartialEq, Eq, Clone, Copy, Error)]
pub enum SubmitError {
    #[error("pool is not running")]
    Stopped,

    #[error("pool capacity of {capacity} outstanding tasks reached")]
    QueueFull { capacity: usize },
}

/// Ошибка, доставляемая через `ResultHandle`
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("pool stopped before the task ran")]
    PoolStopped,

    #[error("timed out waiting for task result")]
    Timeout,
}

impl TaskError {
    /// Сообщение паники, если задача упала
    pub fn panic_message(&self) -> Option<&str> {
        match self {
            TaskError::Panicked(msg) => Some(msg),
            _ => None,
        }
    }
}
