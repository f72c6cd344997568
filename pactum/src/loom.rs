//! Switches the synchronization types used by the primitives between `std`
//! and `loom`, so the same code can be model checked with `--cfg loom`.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(loom)] {
        pub(crate) use loom::sync;
        pub(crate) use loom::thread_local;
        #[cfg(test)]
        pub(crate) use loom::thread;
        #[cfg(test)]
        pub(crate) use loom::model;
    } else {
        pub(crate) use std::sync;
        pub(crate) use std::thread_local;
        #[cfg(test)]
        pub(crate) use std::thread;

        #[cfg(test)]
        #[inline(always)]
        pub(crate) fn model<R>(f: impl FnOnce() -> R) -> R {
            f()
        }
    }
}

use std::sync::PoisonError;
use sync::{Condvar, Mutex, MutexGuard};

/// Locks `mutex`, ignoring poisoning.
///
/// None of the primitives run user code while holding their lock except the
/// turn holder of a `TurnAlternator`, whose state stays consistent even when
/// the holder panics.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Blocks on `condvar` until `condition` returns `false`.
///
/// The predicate is re-checked after every wakeup, spurious or not.
#[inline]
pub(crate) fn wait_while<'a, T>(
    condvar: &Condvar,
    mut guard: MutexGuard<'a, T>,
    mut condition: impl FnMut(&mut T) -> bool,
) -> MutexGuard<'a, T> {
    while condition(&mut *guard) {
        guard = condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
    }
    guard
}
