use super::{
    errors::TaskError,
    result::{drop_panic_payload, panic_message, TaskResult},
};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    time::Duration,
};

/// Итог выполнения задачи с точки зрения воркера
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    /// `delivered == true` если ошибка ушла в `ResultHandle`
    Failed { message: String, delivered: bool },
}

/// Освобождает место задачи в пуле; аргумент: задача завершилась успешно
pub(crate) type Release<'a> = &'a mut dyn FnMut(bool);

/// Стёртая по типу единица работы. Забирается из очереди ровно один раз:
/// либо `run`, либо `abandon`.
pub(crate) trait Job: Send + 'static {
    /// `release` вызывается до публикации итога, чтобы получивший
    /// результат мог сразу занять освободившееся место
    fn run(self: Box<Self>, release: Release<'_>) -> Outcome;

    /// Задача никогда не будет выполнена (пул остановлен)
    fn abandon(self: Box<Self>);
}

pub(crate) type Task = Box<dyn Job>;

pub(crate) struct Detached<F> {
    func: F,
}

impl<F> Detached<F>
where
    F: FnOnce() + Send + 'static,
{
    pub(crate) fn boxed(func: F) -> Task {
        Box::new(Detached { func })
    }
}

impl<F> Job for Detached<F>
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>, release: Release<'_>) -> Outcome {
        let outcome = match catch_unwind(AssertUnwindSafe(self.func)) {
            Ok(()) => Outcome::Completed,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                drop_panic_payload(payload);
                Outcome::Failed { message, delivered: false }
            }
        };
        release(matches!(outcome, Outcome::Completed));
        outcome
    }

    fn abandon(self: Box<Self>) {}
}

pub(crate) struct WithResult<F, T> {
    func: F,
    sender: Sender<TaskResult<T>>,
}

impl<F, T> WithResult<F, T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    pub(crate) fn pair(func: F) -> (Task, ResultHandle<T>) {
        // единственный писатель, единственное значение
        let (sender, receiver) = channel::bounded(1);
        (Box::new(WithResult { func, sender }), ResultHandle::new(receiver))
    }
}

impl<F, T> Job for WithResult<F, T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    fn run(self: Box<Self>, release: Release<'_>) -> Outcome {
        let WithResult { func, sender } = *self;
        match catch_unwind(AssertUnwindSafe(func)) {
            Ok(value) => {
                release(true);
                // получатель мог уже выбросить handle; тогда значение
                // дропается здесь, под защитой воркера
                let _ = sender.send(Ok(value));
                Outcome::Completed
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                drop_panic_payload(payload);
                release(false);
                let delivered = sender.send(Err(TaskError::Panicked(message.clone()))).is_ok();
                Outcome::Failed { message, delivered }
            }
        }
    }

    fn abandon(self: Box<Self>) {
        let _ = self.sender.send(Err(TaskError::PoolStopped));
    }
}

/// Handle на результат задачи, поставленной через `enqueue_task`.
///
/// Хранит ровно один итог: значение или `TaskError`. Если задача сама
/// возвращает `Result<_, E>`, ошибка `E` приходит внутри `Ok` без изменений.
pub struct ResultHandle<T> {
    receiver: Receiver<TaskResult<T>>,
}

impl<T> ResultHandle<T> {
    fn new(receiver: Receiver<TaskResult<T>>) -> Self {
        Self { receiver }
    }

    /// Итог уже записан воркером
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Блокирует поток до завершения задачи или остановки пула
    pub fn get(self) -> TaskResult<T> {
        self.receiver.recv().unwrap_or(Err(TaskError::PoolStopped))
    }

    /// Как `get`, но по истечении `timeout` возвращает `TaskError::Timeout`
    /// (итог задачи при этом теряется)
    pub fn get_timeout(self, timeout: Duration) -> TaskResult<T> {
        match self.wait_timeout(timeout) {
            Ok(result) => result,
            Err(_) => Err(TaskError::Timeout),
        }
    }

    /// Ждёт не дольше `timeout`; если итога ещё нет, возвращает handle обратно
    pub fn wait_timeout(self, timeout: Duration) -> Result<TaskResult<T>, Self> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(TaskError::PoolStopped)),
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }

    /// Неблокирующая проверка; если итога ещё нет, возвращает handle обратно
    pub fn try_get(self) -> Result<TaskResult<T>, Self> {
        match self.receiver.try_recv() {
            Ok(result) => Ok(result),
            Err(TryRecvError::Disconnected) => Ok(Err(TaskError::PoolStopped)),
            Err(TryRecvError::Empty) => Err(self),
        }
    }
}

impl<T: Send + 'static> ResultHandle<T> {
    /// Ожидание из async-кода без блокировки потоков рантайма
    pub async fn join(self) -> TaskResult<T> {
        match tokio::task::spawn_blocking(move || self.get()).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_cancelled() => Err(TaskError::PoolStopped),
            Err(join_err) => Err(TaskError::Panicked(join_err.to_string())),
        }
    }
}

impl<T> fmt::Debug for ResultHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Дожидается всех handles, сохраняя порядок
pub async fn join_handles<T>(handles: Vec<ResultHandle<T>>) -> Vec<TaskResult<T>>
where
    T: Send + 'static,
{
    if handles.is_empty() {
        return Vec::new();
    }
    futures::future::join_all(handles.into_iter().map(ResultHandle::join)).await
}
