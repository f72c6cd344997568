use crate::error::Closed;

use std::sync::Arc;

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A scheduling facility that runs submitted jobs.
///
/// Executors own no deferred values; they only run closures. Every
/// asynchronous operation in this crate takes the executor it schedules on
/// explicitly, except the bound combinators reached through
/// [`Deferred::via_default`](crate::Deferred::via_default).
pub trait Executor: Send + Sync {
    /// Schedules `job` to run.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] when the executor has been shut down. The job is
    /// dropped without running.
    fn execute(&self, job: Job) -> Result<(), Closed>;

    /// Stops accepting new jobs.
    ///
    /// Jobs accepted before the call still run. The default implementation
    /// does nothing.
    fn shutdown(&self) {}
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) -> Result<(), Closed> {
        (**self).execute(job)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, job: Job) -> Result<(), Closed> {
        (**self).execute(job)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

/// Runs every job synchronously on the calling thread.
///
/// Useful in tests: continuations bound to `Inline` run deterministically on
/// the thread that completes their source.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, job: Job) -> Result<(), Closed> {
        job();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn inline_runs_on_caller() {
        let caller = std::thread::current().id();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();

        Inline
            .execute(Box::new(move || {
                assert_eq!(std::thread::current().id(), caller);
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_forwards() {
        let executor: Arc<dyn Executor> = Arc::new(Inline);
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();

        (&executor)
            .execute(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
