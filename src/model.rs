use std::fmt;

/// Приоритет задачи. Порядок: `High > Normal > Low`.
///
/// Планирование строгое: пока в полосе `High` есть задачи, `Normal` и `Low`
/// не выбираются. При постоянном потоке срочных задач `Low` может голодать,
/// это принятый компромисс в пользу задержки срочной работы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Порядок просмотра полос воркером
    pub const SCAN_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    #[inline]
    pub(crate) fn lane(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Running,
    ShuttingDown,
    Terminated,
}

impl PoolState {
    #[inline]
    pub fn is_running(self) -> bool {
        self == PoolState::Running
    }
}

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub workers: usize,
    pub capacity: usize,
    pub active_tasks: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_submitted: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub rejected_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.active_tasks + self.idle_workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / (self.active_tasks + self.idle_workers) as f64
    }

    /// Доля занятой ёмкости (очередь + выполняющиеся)
    pub fn queue_pressure(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        (self.queued_tasks + self.active_tasks) as f64 / self.capacity as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}
