use crate::error::Error;
use crate::runtime::Job;
use crate::runtime::context::{self, WorkerId};
use crate::runtime::pool::core::Shared;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A worker thread of a [`ThreadPool`](crate::ThreadPool).
///
/// The execution order is:
/// 1. Pop from the local queue
/// 2. Take from the global injector
/// 3. Steal from other workers
/// 4. Park until the work epoch moves
pub(crate) struct Worker {
    /// Position of the worker in the pool.
    index: usize,

    shared: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(index: usize, shared: Arc<Shared>) -> Self {
        Self { index, shared }
    }

    /// Runs the worker loop until the pool shuts down and no accepted job
    /// is left for this worker.
    pub(crate) fn run(self) {
        let id = WorkerId {
            pool: self.shared.id,
            index: self.index,
        };

        let span = tracing::debug_span!("worker", pool = %self.shared.name, index = self.index);
        let _enter = span.enter();

        context::enter_worker(id, || {
            tracing::trace!("worker started");

            loop {
                let seen = self.shared.injector.epoch();

                if let Some(job) = self.find_job() {
                    self.run_job(job);
                    continue;
                }

                if !self.shared.injector.park(seen) {
                    break;
                }
            }

            tracing::trace!("worker stopped");
        });
    }

    fn find_job(&self) -> Option<Job> {
        self.shared.locals[self.index]
            .pop()
            .or_else(|| self.shared.injector.steal())
            .or_else(|| self.try_steal())
    }

    /// Runs a job, containing any panic so the worker keeps serving.
    fn run_job(&self, job: Job) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let error = Error::from_panic(payload);
            tracing::warn!(%error, "job panicked on worker thread");
        }
    }

    /// Attempts to steal from another worker's local queue.
    ///
    /// Workers are visited in a round-robin fashion starting after this
    /// one, to spread the load. Half of the victim's jobs move to this
    /// worker's queue; the oldest one is returned.
    fn try_steal(&self) -> Option<Job> {
        let len = self.shared.locals.len();

        if len <= 1 {
            return None;
        }

        let own = &self.shared.locals[self.index];
        (1..len)
            .map(|offset| (self.index + offset) % len)
            .find_map(|victim| self.shared.locals[victim].steal_into(own))
    }
}
