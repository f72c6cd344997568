//! Thread pool implementation.
//!
//! It is composed of:
//! - [`core`]: the [`ThreadPool`] handle and its lifecycle,
//! - [`worker`]: worker threads that run jobs using work-stealing.

pub(crate) mod core;
pub(crate) mod worker;

pub use self::core::ThreadPool;
