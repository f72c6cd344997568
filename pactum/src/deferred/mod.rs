//! Deferred computations.
//!
//! A [`Deferred`] is a single value or error that becomes available
//! asynchronously, exactly once; a [`Promise`] is the handle that completes
//! it. Work is started with [`submit`] on an explicit [`Executor`], and
//! further work is derived with combinators that run either on the thread
//! that completes their source or on a bound executor (see [`Bound`]).
//!
//! The state machine is `Pending -> Fulfilled | Rejected`, taken once.
//! Continuations registered while pending fire once, in registration order,
//! when the deferred completes; continuations registered afterwards fire
//! immediately on the registering thread.
//!
//! [`Executor`]: crate::Executor

mod aggregate;
mod combinators;
mod core;
mod handle;
mod promise;
mod task;
mod trampoline;

pub mod observer;

pub use aggregate::{all_of, any_of};
pub use combinators::Bound;
pub use handle::Deferred;
pub use promise::Promise;
pub use task::{submit, try_submit};
