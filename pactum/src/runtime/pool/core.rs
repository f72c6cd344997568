use crate::error::Closed;
use crate::loom::lock;
use crate::loom::sync::Mutex;
use crate::runtime::builder::ThreadPoolBuilder;
use crate::runtime::context::{self, WorkerId};
use crate::runtime::pool::worker::Worker;
use crate::runtime::work_stealing::injector::Injector;
use crate::runtime::work_stealing::queue::LocalQueue;
use crate::runtime::{Executor, Job};

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// State shared between a pool's handles and its worker threads.
pub(crate) struct Shared {
    /// Process-unique pool id, used to recognize the pool's own workers.
    pub(crate) id: u64,

    /// Pool name, prefix of the worker thread names.
    pub(crate) name: String,

    /// Global injector queue shared by all workers.
    pub(crate) injector: Injector,

    /// One local queue per worker, indexed by worker index.
    pub(crate) locals: Box<[LocalQueue]>,
}

struct Inner {
    shared: Arc<Shared>,

    /// Join handles for worker threads.
    threads: Mutex<Vec<JoinHandle<()>>>,
}

/// A fixed-size, work-stealing pool of worker threads.
///
/// `ThreadPool` is a cheap handle: clones refer to the same workers. When
/// the last handle is dropped the pool shuts down, its workers finish every
/// job already accepted, and the threads are joined.
///
/// A job submitted from one of the pool's own workers goes to that worker's
/// local queue; jobs from any other thread go through the global injector.
/// A job that panics is logged and does not take its worker down.
#[derive(Clone)]
pub struct ThreadPool {
    inner: Arc<Inner>,
}

impl ThreadPool {
    /// Returns a builder for configuring a new pool.
    pub fn builder() -> ThreadPoolBuilder {
        ThreadPoolBuilder::new()
    }

    /// Spawns `threads` workers named `{name}-{index}`.
    pub(crate) fn new(name: String, threads: usize) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            name,
            injector: Injector::new(),
            locals: (0..threads).map(|_| LocalQueue::new()).collect(),
        });

        let mut handles = Vec::with_capacity(threads);

        for index in 0..threads {
            let worker = Worker::new(index, shared.clone());

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", shared.name, index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    tracing::error!(pool = %shared.name, %err, "failed to spawn worker thread");
                    shared.injector.shutdown();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(err);
                }
            }
        }

        tracing::debug!(pool = %shared.name, threads, "thread pool started");

        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                threads: Mutex::new(handles),
            }),
        })
    }

    /// Number of worker threads.
    pub fn worker_threads(&self) -> usize {
        self.inner.shared.locals.len()
    }

    /// Name of the pool, the prefix of its worker thread names.
    pub fn name(&self) -> &str {
        &self.inner.shared.name
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.inner.shared.injector.is_shutdown()
    }

    /// Stops accepting jobs.
    ///
    /// Jobs accepted before the call still run; afterwards
    /// [`execute`](Executor::execute) returns [`Closed`]. Does not block;
    /// use [`join`](Self::join) to wait for the workers to exit.
    pub fn shutdown(&self) {
        if !self.is_shutdown() {
            tracing::debug!(pool = %self.name(), "thread pool shutting down");
        }
        self.inner.shared.injector.shutdown();
    }

    /// Shuts the pool down and waits for every worker thread to exit.
    ///
    /// Called from one of the pool's own workers, that worker is not waited
    /// for.
    pub fn join(&self) {
        self.shutdown();
        self.inner.join_threads();
    }

    /// The pool worker running on the calling thread, if any.
    pub fn current_worker() -> Option<WorkerId> {
        context::current_worker()
    }

    /// Whether the calling thread is one of this pool's workers.
    pub fn is_worker_thread(&self) -> bool {
        context::current_worker().is_some_and(|worker| worker.pool == self.inner.shared.id)
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: Job) -> Result<(), Closed> {
        let shared = &self.inner.shared;

        match context::current_worker() {
            Some(worker) if worker.pool == shared.id => {
                if shared.injector.is_shutdown() {
                    return Err(Closed(()));
                }
                shared.locals[worker.index].push(job);
                shared.injector.notify_local_push();
                Ok(())
            }
            _ => shared.injector.push(job),
        }
    }

    fn shutdown(&self) {
        ThreadPool::shutdown(self);
    }
}

impl Inner {
    fn join_threads(&self) {
        let handles: Vec<_> = lock(&self.threads).drain(..).collect();
        let current = thread::current().id();

        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shared.injector.shutdown();
        self.join_threads();
        tracing::debug!(pool = %self.shared.name, "thread pool stopped");
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("name", &self.name())
            .field("worker_threads", &self.worker_threads())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn jobs_run_on_named_workers() {
        let pool = ThreadPool::builder()
            .worker_threads(2)
            .name("unit")
            .build()
            .unwrap();
        let (tx, rx) = mpsc::channel();

        let p = pool.clone();
        pool.execute(Box::new(move || {
            let name = thread::current().name().map(str::to_owned);
            tx.send((name, p.is_worker_thread())).unwrap();
        }))
        .unwrap();

        let (name, on_worker) = rx.recv().unwrap();
        assert!(name.unwrap().starts_with("unit-"));
        assert!(on_worker);
        assert!(!pool.is_worker_thread());
    }

    #[test]
    fn nested_jobs_go_to_local_queue() {
        let pool = ThreadPool::builder().worker_threads(1).build().unwrap();
        let (tx, rx) = mpsc::channel();

        let p = pool.clone();
        pool.execute(Box::new(move || {
            let outer = ThreadPool::current_worker().unwrap();
            p.execute(Box::new(move || {
                tx.send((outer, ThreadPool::current_worker().unwrap())).unwrap();
            }))
            .unwrap();
        }))
        .unwrap();

        let (outer, inner) = rx.recv().unwrap();
        assert_eq!(outer, inner);
        assert_eq!(inner.index(), 0);
    }

    #[test]
    fn join_drains_accepted_jobs() {
        let pool = ThreadPool::builder().worker_threads(2).build().unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..50 {
            let tx = tx.clone();
            pool.execute(Box::new(move || tx.send(i).unwrap())).unwrap();
        }
        drop(tx);

        pool.join();
        assert!(pool.is_shutdown());
        assert_eq!(rx.iter().count(), 50);
        assert_eq!(pool.execute(Box::new(|| {})), Err(Closed(())));
    }
}
