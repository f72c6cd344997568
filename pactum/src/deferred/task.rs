use crate::deferred::{Deferred, Promise};
use crate::error::{Error, Result};
use crate::runtime::Executor;

use std::panic::{self, AssertUnwindSafe};

/// Runs `f` on `executor` and returns a deferred of its value
/// ("supplyAsync", or "runAsync" when `T = ()`).
///
/// The deferred is fulfilled with the value `f` returns, or rejected with
/// [`Error::Panicked`] if `f` panics. If the executor is closed the
/// deferred is returned already rejected with [`Error::Closed`].
///
/// ```rust
/// use pactum::{submit, ThreadPool};
///
/// let pool = ThreadPool::builder().worker_threads(2).build().unwrap();
/// let answer = submit(&pool, || 6 * 7);
///
/// assert_eq!(answer.join().unwrap(), 42);
/// ```
pub fn submit<E, T, F>(executor: &E, f: F) -> Deferred<T>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    try_submit(executor, move || Ok(f()))
}

/// Like [`submit`], for a fallible function: an `Err` returned by `f`
/// rejects the deferred.
pub fn try_submit<E, T, F>(executor: &E, f: F) -> Deferred<T>
where
    E: Executor + ?Sized,
    T: Clone + Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let promise = Promise::new();
    let deferred = promise.deferred();
    let fallback = promise.clone();

    let job = Box::new(move || match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => {
            promise.complete(outcome);
        }
        Err(payload) => {
            let error = Error::from_panic(payload);
            tracing::warn!(%error, "submitted task panicked");
            promise.reject(error);
        }
    });

    tracing::trace!("submitting task");

    if let Err(closed) = executor.execute(job) {
        tracing::warn!("task submitted to a closed executor");
        fallback.reject(closed.into());
    }

    deferred
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::runtime::{Inline, Job};
    use crate::error::Closed;

    struct ClosedExecutor;

    impl Executor for ClosedExecutor {
        fn execute(&self, _job: Job) -> std::result::Result<(), Closed> {
            Err(Closed(()))
        }
    }

    #[test]
    fn inline_submit_completes_before_returning() {
        let deferred = submit(&Inline, || 5);
        assert!(matches!(deferred.peek(), Some(Ok(5))));
    }

    #[test]
    fn error_return_rejects() {
        let deferred = try_submit(&Inline, || Err::<u8, _>(Error::msg("nope")));
        assert!(matches!(deferred.join(), Err(Error::TaskFailure(_))));
    }

    #[test]
    fn panic_rejects() {
        let deferred = submit(&Inline, || -> u8 { panic!("exploded") });
        assert!(matches!(deferred.join(), Err(Error::Panicked(msg)) if &*msg == "exploded"));
    }

    #[test]
    fn closed_executor_rejects() {
        let deferred = submit(&ClosedExecutor, || 1);
        assert!(matches!(deferred.peek(), Some(Err(Error::Closed))));
    }
}
