//! Blocking coordination primitives.
//!
//! Unlike [`Deferred`](crate::Deferred), these block the calling OS thread
//! and are meant for plain threads cooperating on shared state:
//!
//! - [`TurnAlternator`] forces a fixed set of threads to act in strict
//!   rotation.
//! - [`CompletionGate`] lets threads wait until a number of events have
//!   happened.
//!
//! Both are safe to share behind an `Arc`.

mod alternator;
mod gate;

pub use alternator::{Turn, TurnAlternator};
pub use gate::CompletionGate;
