//! Work-stealing queues of a [`ThreadPool`](crate::ThreadPool).
//!
//! It consists of:
//! - [`injector`]: the global queue for jobs submitted from outside the
//!   pool, which also parks idle workers,
//! - [`queue`]: per-worker local queues used for jobs a worker submits to
//!   its own pool, and for stealing.

pub(crate) mod injector;
pub(crate) mod queue;
