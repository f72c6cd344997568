use crate::error::Closed;
use crate::loom::sync::{Condvar, Mutex};
use crate::loom::{lock, wait_while};
use crate::runtime::Job;

use std::collections::VecDeque;

/// Global job queue of a pool.
///
/// Jobs submitted from outside the pool land here before being picked up
/// by a worker. The injector also coordinates parking: idle workers sleep
/// on its condition variable until the work epoch moves or the pool shuts
/// down.
pub(crate) struct Injector {
    state: Mutex<State>,
    condvar: Condvar,
}

struct State {
    /// Queue holding globally injected jobs.
    queue: VecDeque<Job>,

    /// Bumped on every push, local or global.
    ///
    /// A worker snapshots the epoch before scanning the queues and only
    /// parks if it has not moved since, so a push racing with the scan is
    /// never missed.
    epoch: u64,

    /// Set once the pool stops accepting work.
    shutdown: bool,
}

impl Injector {
    /// Creates a new empty injector.
    pub(crate) fn new() -> Self {
        Injector {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                epoch: 0,
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Signals shutdown and wakes all parked workers.
    ///
    /// Jobs already queued stay queued; workers drain them before exiting.
    pub(crate) fn shutdown(&self) {
        lock(&self.state).shutdown = true;
        self.condvar.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        lock(&self.state).shutdown
    }

    /// Pushes a job into the global queue and wakes one parked worker.
    pub(crate) fn push(&self, job: Job) -> Result<(), Closed> {
        let mut state = lock(&self.state);
        if state.shutdown {
            return Err(Closed(()));
        }

        state.queue.push_back(job);
        state.epoch = state.epoch.wrapping_add(1);
        drop(state);

        self.condvar.notify_one();
        Ok(())
    }

    /// Records that a job was pushed to some worker's local queue, so that
    /// a parked worker can come and steal it.
    pub(crate) fn notify_local_push(&self) {
        let mut state = lock(&self.state);
        state.epoch = state.epoch.wrapping_add(1);
        drop(state);

        self.condvar.notify_one();
    }

    /// Current work epoch.
    pub(crate) fn epoch(&self) -> u64 {
        lock(&self.state).epoch
    }

    /// Parks the calling worker until work may be available.
    ///
    /// Returns immediately if the epoch differs from `seen`, the queue is
    /// non-empty, or the pool is shutting down. Returns `false` once the
    /// pool is shut down and the global queue is drained: the worker should
    /// exit.
    pub(crate) fn park(&self, seen: u64) -> bool {
        let state = wait_while(&self.condvar, lock(&self.state), |state| {
            !state.shutdown && state.queue.is_empty() && state.epoch == seen
        });

        !(state.shutdown && state.queue.is_empty())
    }

    /// Takes a job from the front of the global queue.
    pub(crate) fn steal(&self) -> Option<Job> {
        lock(&self.state).queue.pop_front()
    }
}
