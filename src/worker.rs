use super::{
    handle::Outcome,
    pool::Shared,
    queue::PendingEntry,
    result::{drop_panic_payload, panic_message},
};
use parking_lot::MutexGuard;
use std::{
    cell::Cell,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{debug, trace, warn};

thread_local! {
    static WORKER_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Индекс воркера, выполняющего текущий поток; `None` вне воркера
#[inline]
pub fn current_worker_index() -> Option<usize> {
    WORKER_INDEX.with(Cell::get)
}

pub(crate) fn worker_loop(index: usize, shared: Arc<Shared>) {
    WORKER_INDEX.with(|slot| slot.set(Some(index)));
    debug!(worker = index, "worker started");

    let mut queue = shared.queue.lock();
    loop {
        let entry = match queue.pop() {
            Some(entry) => entry,
            None if queue.state().is_running() => {
                queue.mark_idle();
                shared.available.wait(&mut queue);
                queue.mark_busy();
                continue;
            }
            // остановка и все полосы пусты
            None => break,
        };

        // место в пуле освобождается внутри execute, до публикации итога
        MutexGuard::unlocked(&mut queue, || execute(index, entry, &shared));
    }

    if queue.worker_exited() {
        debug!("last worker exited, pool terminated");
    }
    drop(queue);
    WORKER_INDEX.with(|slot| slot.set(None));
    debug!(worker = index, "worker stopped");
}

fn execute(index: usize, entry: PendingEntry, shared: &Shared) {
    let PendingEntry { task, priority, seq } = entry;
    trace!(worker = index, seq, %priority, "running task");

    let mut released = false;
    let mut release = |succeeded: bool| {
        if !released {
            released = true;
            shared.queue.lock().finish(succeeded);
        }
    };

    // паника в Drop результата или payload не должна убить воркер
    let outcome = match catch_unwind(AssertUnwindSafe(|| task.run(&mut release))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            drop_panic_payload(payload);
            Outcome::Failed { message, delivered: false }
        }
    };
    release(matches!(outcome, Outcome::Completed));

    if let Outcome::Failed { message, delivered } = &outcome {
        if *delivered {
            debug!(worker = index, seq, %message, "task panicked, error delivered to handle");
        } else {
            warn!(worker = index, seq, %message, "task panicked with no handle to report to");
        }
    }
}
