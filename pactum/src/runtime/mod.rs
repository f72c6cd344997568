//! Executors.
//!
//! This module contains the scheduling side of the crate:
//! - the [`Executor`] abstraction and the synchronous [`Inline`] executor,
//! - [`ThreadPool`], a work-stealing pool of OS threads,
//! - the process-wide [`default`] executor.
//!
//! Executors know nothing about deferred values; they only run jobs.

mod builder;
mod context;
mod executor;
mod pool;
mod work_stealing;

pub mod default;

pub use builder::ThreadPoolBuilder;
pub use context::WorkerId;
pub use executor::{Executor, Inline, Job};
pub use pool::ThreadPool;
