//! # Pactum
//!
//! **Pactum** is a small toolkit for composing concurrent work inside one
//! process. It combines explicit executors, single-assignment deferred
//! values, and a pair of blocking coordination primitives.
//!
//! It offers:
//!
//! - An **[`Executor`]** abstraction with a work-stealing [`ThreadPool`] and
//!   a synchronous [`Inline`] executor
//! - **[`Deferred`] values** completed once through a [`Promise`], with
//!   chaining combinators (`map`, `flat_map`, `combine`, `recover`, ...)
//!   that run either on the completing thread or on a bound executor
//! - **Aggregation** of many deferred values with [`any_of`] and [`all_of`]
//! - A **[`TurnAlternator`]** forcing threads to act in strict rotation
//! - A **[`CompletionGate`]**, a one-shot countdown latch
//!
//! ## Quick Start
//!
//! ```rust
//! use pactum::{submit, ThreadPool};
//!
//! let pool = ThreadPool::builder().worker_threads(2).name("work").build().unwrap();
//!
//! let a = submit(&pool, || 1);
//! let b = submit(&pool, || 2);
//! let sum = a.combine(&b, |a, b| a + b).map(|n| n * 10);
//!
//! assert_eq!(sum.join().unwrap(), 30);
//! ```
//!
//! Failures travel down the chain as [`Error`] values and can be turned
//! back into values with [`Deferred::recover`]:
//!
//! ```rust
//! use pactum::{try_submit, Error, Inline};
//!
//! let balance = try_submit(&Inline, || Err::<u32, _>(Error::msg("account locked")))
//!     .map(|balance| balance + 1)
//!     .recover(|_| 0);
//!
//! assert_eq!(balance.join().unwrap(), 0);
//! ```
//!
//! ## Logging
//!
//! Pactum reports through [`tracing`]: pool lifecycle at `debug`, job
//! scheduling at `trace`, and panicking tasks or unobserved rejections at
//! `warn`. Install any subscriber to see them.
//!
//! ## Getting Started
//!
//! Add Pactum to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pactum = { git = "https://github.com/Nebula-ecosystem/Pactum", package = "pactum" }
//! ```

mod deferred;
mod error;
mod loom;
mod runtime;
mod sync;

pub use deferred::{Bound, Deferred, Promise, all_of, any_of, observer, submit, try_submit};
pub use error::{Closed, Error, Result, RotationError};
pub use runtime::{Executor, Inline, Job, ThreadPool, ThreadPoolBuilder, WorkerId, default};
pub use sync::{CompletionGate, Turn, TurnAlternator};
