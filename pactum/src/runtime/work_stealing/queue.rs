use crate::loom::lock;
use crate::loom::sync::Mutex;
use crate::runtime::Job;

use std::collections::VecDeque;

/// A per-worker local job queue.
///
/// Holds continuation jobs submitted by the worker to its own pool. The
/// owner pushes and pops at the back (LIFO), so the follow-up of a job
/// usually runs next on the same thread. Thieves take from the front
/// (FIFO), half of the queue at a time.
pub(crate) struct LocalQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl LocalQueue {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn push(&self, job: Job) {
        lock(&self.jobs).push_back(job);
    }

    pub(crate) fn pop(&self) -> Option<Job> {
        lock(&self.jobs).pop_back()
    }

    /// Moves the older half of this queue (rounded up) to `thief`.
    ///
    /// The oldest stolen job is returned for immediate execution, the rest
    /// land in `thief` in their original order. Only one queue is locked at
    /// a time.
    pub(crate) fn steal_into(&self, thief: &LocalQueue) -> Option<Job> {
        let mut stolen: VecDeque<Job> = {
            let mut jobs = lock(&self.jobs);
            let count = jobs.len().div_ceil(2);
            jobs.drain(..count).collect()
        };

        let first = stolen.pop_front()?;
        if !stolen.is_empty() {
            lock(&thief.jobs).extend(stolen);
        }
        Some(first)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.jobs).len()
    }
}
