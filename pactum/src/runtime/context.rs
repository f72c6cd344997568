use std::cell::Cell;
use std::fmt;

/// Identifies a worker thread of a [`ThreadPool`](crate::ThreadPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId {
    pub(crate) pool: u64,
    pub(crate) index: usize,
}

impl WorkerId {
    /// Position of the worker inside its pool, in `0..worker_threads`.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}/worker#{}", self.pool, self.index)
    }
}

thread_local! {
    /// The pool worker running on this thread, if any.
    ///
    /// Set for the whole lifetime of a worker thread. Lets `execute` push
    /// jobs submitted from inside the pool onto the submitting worker's
    /// local queue.
    static CURRENT_WORKER: Cell<Option<WorkerId>> = const { Cell::new(None) };
}

/// Runs `f` with the current thread registered as worker `id`.
///
/// The previous registration is restored afterwards.
pub(crate) fn enter_worker<R>(id: WorkerId, f: impl FnOnce() -> R) -> R {
    let prev = CURRENT_WORKER.with(|cell| cell.replace(Some(id)));
    let out = f();
    CURRENT_WORKER.with(|cell| cell.set(prev));
    out
}

/// The worker running on this thread, if this is a pool thread.
pub(crate) fn current_worker() -> Option<WorkerId> {
    CURRENT_WORKER.with(Cell::get)
}
