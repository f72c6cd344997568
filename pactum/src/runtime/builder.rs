use super::ThreadPool;

use std::io;
use std::thread;

/// Builder for configuring and creating a [`ThreadPool`].
///
/// # Examples
///
/// ```rust
/// use pactum::ThreadPoolBuilder;
///
/// let pool = ThreadPoolBuilder::new()
///     .worker_threads(4)
///     .name("io")
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.worker_threads(), 4);
/// assert_eq!(pool.name(), "io");
/// ```
#[derive(Debug, Clone)]
pub struct ThreadPoolBuilder {
    /// Number of worker threads in the pool.
    worker_threads: usize,

    /// Prefix of the worker thread names.
    name: String,
}

impl ThreadPoolBuilder {
    /// Creates a new `ThreadPoolBuilder` with default configuration.
    ///
    /// By default, the number of worker threads is set to the number
    /// of available logical CPUs, falling back to `1` if unavailable, and
    /// the pool is named `pactum`.
    pub fn new() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            name: String::from("pactum"),
        }
    }

    /// Sets the number of worker threads used by the pool.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn worker_threads(mut self, n: usize) -> Self {
        assert!(n > 0, "worker_threads must be > 0");

        self.worker_threads = n;
        self
    }

    /// Sets the pool name. Worker threads are named `{name}-{index}`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Spawns the worker threads.
    ///
    /// # Errors
    ///
    /// Returns the OS error if a worker thread cannot be spawned; the
    /// workers spawned so far are stopped.
    pub fn build(self) -> io::Result<ThreadPool> {
        ThreadPool::new(self.name, self.worker_threads)
    }
}

impl Default for ThreadPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "worker_threads must be > 0")]
    fn zero_workers_rejected() {
        let _ = ThreadPoolBuilder::new().worker_threads(0);
    }

    #[test]
    fn defaults() {
        let builder = ThreadPoolBuilder::default();
        assert!(builder.worker_threads >= 1);
        assert_eq!(builder.name, "pactum");
    }
}
