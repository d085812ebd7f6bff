//! Три FIFO-полосы под одним мьютексом плюс учёт ёмкости.
//!
//! Всё состояние, которое делят воркеры и отправители, живёт здесь и
//! меняется только под `Mutex<QueueSet>`.

use super::{
    errors::SubmitError,
    handle::Task,
    model::{PoolMetrics, PoolState, Priority},
};
use std::collections::VecDeque;

pub(crate) struct PendingEntry {
    pub task: Task,
    pub priority: Priority,
    pub seq: u64,
}

pub(crate) struct QueueSet {
    lanes: [VecDeque<PendingEntry>; 3],
    next_seq: u64,
    capacity: usize,
    in_flight: usize,
    state: PoolState,
    live_workers: usize,
    idle_workers: usize,
    total_submitted: usize,
    completed: usize,
    failed: usize,
    rejected: usize,
}

impl QueueSet {
    pub fn new(capacity: usize, workers: usize) -> Self {
        Self {
            lanes: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            next_seq: 0,
            capacity,
            in_flight: 0,
            state: PoolState::Running,
            live_workers: workers,
            idle_workers: 0,
            total_submitted: 0,
            completed: 0,
            failed: 0,
            rejected: 0,
        }
    }

    /// Можно ли принять ещё одну задачу. Ёмкость считается по
    /// очереди + выполняющимся.
    pub fn check_admission(&mut self) -> Result<(), SubmitError> {
        let verdict = if self.state != PoolState::Running {
            Err(SubmitError::Stopped)
        } else if self.outstanding() >= self.capacity {
            Err(SubmitError::QueueFull { capacity: self.capacity })
        } else {
            Ok(())
        };
        if verdict.is_err() {
            self.rejected += 1;
        }
        verdict
    }

    /// Кладёт задачу в её полосу. Вызывать только после `check_admission`.
    pub fn push(&mut self, task: Task, priority: Priority) -> u64 {
        debug_assert!(self.state == PoolState::Running);
        debug_assert!(self.outstanding() < self.capacity);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.total_submitted += 1;
        self.lanes[priority.lane()].push_back(PendingEntry { task, priority, seq });
        seq
    }

    /// Самая старая запись самой приоритетной непустой полосы.
    /// Запись сразу считается выполняющейся.
    pub fn pop(&mut self) -> Option<PendingEntry> {
        let entry = Priority::SCAN_ORDER
            .iter()
            .find_map(|p| self.lanes[p.lane()].pop_front())?;
        self.in_flight += 1;
        Some(entry)
    }

    /// Освобождает место выполнившейся задачи
    pub fn finish(&mut self, succeeded: bool) {
        debug_assert!(self.in_flight > 0);
        self.in_flight -= 1;
        if succeeded {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Забирает все ожидающие записи в порядке планирования
    pub fn drain(&mut self) -> Vec<PendingEntry> {
        let mut drained = Vec::with_capacity(self.queued());
        for p in Priority::SCAN_ORDER {
            drained.extend(self.lanes[p.lane()].drain(..));
        }
        drained
    }

    #[inline]
    pub fn queued(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    #[inline]
    pub fn outstanding(&self) -> usize {
        self.queued() + self.in_flight
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Running -> ShuttingDown. Возвращает `true` если переход случился сейчас.
    pub fn begin_shutdown(&mut self) -> bool {
        if self.state == PoolState::Running {
            self.state = if self.live_workers == 0 {
                PoolState::Terminated
            } else {
                PoolState::ShuttingDown
            };
            return true;
        }
        false
    }

    #[inline]
    pub fn idle_workers(&self) -> usize {
        self.idle_workers
    }

    pub fn mark_idle(&mut self) {
        self.idle_workers += 1;
    }

    pub fn mark_busy(&mut self) {
        self.idle_workers -= 1;
    }

    /// Воркер вышел из цикла; последний переводит пул в Terminated
    pub fn worker_exited(&mut self) -> bool {
        self.live_workers -= 1;
        if self.live_workers == 0 && self.state == PoolState::ShuttingDown {
            self.state = PoolState::Terminated;
            return true;
        }
        false
    }

    pub fn metrics(&self, workers: usize) -> PoolMetrics {
        PoolMetrics {
            workers,
            capacity: self.capacity,
            active_tasks: self.in_flight,
            idle_workers: self.idle_workers,
            queued_tasks: self.queued(),
            total_submitted: self.total_submitted,
            completed_tasks: self.completed,
            failed_tasks: self.failed,
            rejected_tasks: self.rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Detached;

    fn noop() -> Task {
        Detached::boxed(|| {})
    }

    fn admit(q: &mut QueueSet, p: Priority) -> Result<u64, SubmitError> {
        q.check_admission()?;
        Ok(q.push(noop(), p))
    }

    #[test]
    fn high_before_earlier_low() {
        let mut q = QueueSet::new(8, 1);
        admit(&mut q, Priority::Low).unwrap();
        admit(&mut q, Priority::Normal).unwrap();
        admit(&mut q, Priority::High).unwrap();

        let order: Vec<_> = std::iter::from_fn(|| q.pop().map(|e| e.priority)).collect();
        assert_eq!(order, vec![Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn fifo_within_lane() {
        let mut q = QueueSet::new(16, 1);
        let seqs: Vec<_> = (0..5).map(|_| admit(&mut q, Priority::Normal).unwrap()).collect();
        admit(&mut q, Priority::Low).unwrap();

        let popped: Vec<_> = (0..5).map(|_| q.pop().unwrap().seq).collect();
        assert_eq!(popped, seqs);
        assert_eq!(q.pop().unwrap().priority, Priority::Low);
        assert!(q.pop().is_none());
    }

    #[test]
    fn capacity_counts_in_flight() {
        let mut q = QueueSet::new(2, 1);
        admit(&mut q, Priority::Normal).unwrap();
        admit(&mut q, Priority::Normal).unwrap();
        assert_eq!(admit(&mut q, Priority::High), Err(SubmitError::QueueFull { capacity: 2 }));

        // выполняющаяся запись всё ещё занимает место
        let entry = q.pop().unwrap();
        assert_eq!(q.queued(), 1);
        assert!(admit(&mut q, Priority::Normal).is_err());

        let mut succeeded = None;
        entry.task.run(&mut |ok| succeeded = Some(ok));
        q.finish(succeeded.unwrap());
        assert!(admit(&mut q, Priority::Normal).is_ok());
        assert_eq!(q.metrics(1).rejected_tasks, 2);
    }

    #[test]
    fn shutdown_rejects_and_drains() {
        let mut q = QueueSet::new(4, 2);
        admit(&mut q, Priority::Low).unwrap();
        admit(&mut q, Priority::High).unwrap();

        assert!(q.begin_shutdown());
        assert!(!q.begin_shutdown());
        assert_eq!(q.state(), PoolState::ShuttingDown);
        assert_eq!(admit(&mut q, Priority::High), Err(SubmitError::Stopped));

        let drained: Vec<_> = q.drain().into_iter().map(|e| e.priority).collect();
        assert_eq!(drained, vec![Priority::High, Priority::Low]);
        assert_eq!(q.queued(), 0);

        assert!(!q.worker_exited());
        assert!(q.worker_exited());
        assert_eq!(q.state(), PoolState::Terminated);
    }
}
