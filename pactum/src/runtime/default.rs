//! The process-wide default executor.
//!
//! Used only by bound combinators reached through
//! [`Deferred::via_default`](crate::Deferred::via_default). Everything else
//! takes its executor explicitly.
//!
//! The default is a [`ThreadPool`] named `pactum-default` with one worker
//! less than the number of logical CPUs (at least one). It is created on
//! first use and lives until [`shutdown`] or process exit. Tests can
//! [`install`] a deterministic executor such as [`Inline`] instead.

use crate::runtime::{Executor, Inline, ThreadPoolBuilder};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Name of the default pool, the prefix of its worker thread names.
pub const DEFAULT_POOL_NAME: &str = "pactum-default";

static DEFAULT: Mutex<Option<Arc<dyn Executor>>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Arc<dyn Executor>>> {
    DEFAULT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the default executor, starting the default pool if needed.
///
/// If the pool cannot be started the error is logged and an [`Inline`]
/// executor is used instead, so work bound to the default still runs.
pub fn executor() -> Arc<dyn Executor> {
    let mut slot = slot();

    if let Some(executor) = slot.as_ref() {
        return executor.clone();
    }

    let executor = start_pool();
    *slot = Some(executor.clone());
    executor
}

/// Replaces the default executor, returning the previous one if it was
/// already created.
///
/// The previous executor is not shut down.
pub fn install(executor: Arc<dyn Executor>) -> Option<Arc<dyn Executor>> {
    tracing::debug!("installing a custom default executor");
    slot().replace(executor)
}

/// Shuts the default executor down.
///
/// Jobs it already accepted still run. The next call to [`executor`]
/// starts a fresh default pool.
pub fn shutdown() {
    let previous = slot().take();

    if let Some(executor) = previous {
        tracing::debug!("shutting down the default executor");
        executor.shutdown();
    }
}

fn start_pool() -> Arc<dyn Executor> {
    let threads = thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1);

    match ThreadPoolBuilder::new()
        .name(DEFAULT_POOL_NAME)
        .worker_threads(threads)
        .build()
    {
        Ok(pool) => {
            tracing::debug!(threads, "default pool created");
            Arc::new(pool)
        }
        Err(err) => {
            tracing::error!(%err, "failed to start the default pool, running inline");
            Arc::new(Inline)
        }
    }
}
