use crate::loom::sync::{Condvar, Mutex};
use crate::loom::{lock, wait_while};

use std::fmt;

/// A one-shot countdown latch.
///
/// The gate starts closed with a count. Each [`count_down`](Self::count_down)
/// decrements it; once it reaches zero the gate opens for good and every
/// thread blocked in [`wait`](Self::wait) is released. The count never goes
/// below zero and the gate cannot be reset.
///
/// ```rust
/// use pactum::CompletionGate;
/// use std::sync::Arc;
/// use std::thread;
///
/// let gate = Arc::new(CompletionGate::new(2));
///
/// for _ in 0..2 {
///     let gate = gate.clone();
///     thread::spawn(move || gate.count_down());
/// }
///
/// gate.wait();
/// assert_eq!(gate.count(), 0);
/// ```
pub struct CompletionGate {
    count: Mutex<usize>,
    condvar: Condvar,
}

impl CompletionGate {
    /// Creates a gate that opens after `count` calls to
    /// [`count_down`](Self::count_down).
    ///
    /// A gate created with a count of zero is already open.
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            condvar: Condvar::new(),
        }
    }

    /// Decrements the count, opening the gate when it reaches zero.
    ///
    /// Calling this on an open gate has no effect.
    pub fn count_down(&self) {
        let mut count = lock(&self.count);
        if *count == 0 {
            return;
        }

        *count -= 1;
        tracing::trace!(remaining = *count, "gate counted down");

        if *count == 0 {
            tracing::debug!("gate opened");
            self.condvar.notify_all();
        }
    }

    /// Blocks until the gate is open.
    ///
    /// Returns immediately if it already is.
    pub fn wait(&self) {
        let _open = wait_while(&self.condvar, lock(&self.count), |count| *count > 0);
    }

    /// Current count.
    pub fn count(&self) -> usize {
        *lock(&self.count)
    }

    /// Whether the count has reached zero.
    pub fn is_open(&self) -> bool {
        self.count() == 0
    }
}

impl fmt::Debug for CompletionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGate")
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::sync::Arc;
    use crate::loom::{self, thread};

    #[cfg(not(loom))]
    #[test]
    fn count_never_underflows() {
        let gate = CompletionGate::new(2);
        assert!(!gate.is_open());

        gate.count_down();
        gate.count_down();
        gate.count_down();

        assert_eq!(gate.count(), 0);
        assert!(gate.is_open());
        gate.wait();
    }

    #[cfg(not(loom))]
    #[test]
    fn zero_gate_is_open() {
        let gate = CompletionGate::new(0);
        gate.wait();
        gate.count_down();
        assert_eq!(gate.count(), 0);
    }

    #[test]
    fn waiter_released_after_last_count_down() {
        loom::model(|| {
            let gate = Arc::new(CompletionGate::new(2));

            let counters: Vec<_> = (0..2)
                .map(|_| {
                    let gate = gate.clone();
                    thread::spawn(move || gate.count_down())
                })
                .collect();

            gate.wait();
            assert_eq!(gate.count(), 0);

            for counter in counters {
                counter.join().unwrap();
            }
        });
    }
}
