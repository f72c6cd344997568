use crate::deferred::Deferred;
use crate::deferred::core::Inner;
use crate::error::{Error, Result};

use std::fmt;
use std::sync::Arc;

/// The write side of a [`Deferred`].
///
/// Completing a promise is idempotent: only the first call to
/// [`fulfill`](Self::fulfill), [`reject`](Self::reject) or
/// [`complete`](Self::complete) has an effect, every later call is a silent
/// no-op that returns `false`.
///
/// ```rust
/// use pactum::Promise;
///
/// let promise = Promise::new();
/// let deferred = promise.deferred();
///
/// assert!(promise.fulfill(1));
/// assert!(!promise.fulfill(2));
/// assert_eq!(deferred.join().unwrap(), 1);
/// ```
pub struct Promise<T: 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: 'static> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a pending promise.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// The deferred completed by this promise.
    pub fn deferred(&self) -> Deferred<T> {
        Deferred::from_inner(self.inner.clone())
    }

    /// Fulfills the deferred with `value`.
    ///
    /// Returns `true` if this call completed the deferred.
    pub fn fulfill(&self, value: T) -> bool {
        self.inner.complete(Ok(value))
    }

    /// Rejects the deferred with `error`.
    ///
    /// Returns `true` if this call completed the deferred.
    pub fn reject(&self, error: Error) -> bool {
        self.inner.complete(Err(error))
    }

    /// Completes the deferred with `outcome`.
    ///
    /// Returns `true` if this call completed the deferred.
    pub fn complete(&self, outcome: Result<T>) -> bool {
        self.inner.complete(outcome)
    }

    /// Marks the outcome as already handled, so a rejection is not
    /// reported as unobserved when the last handle goes away.
    pub(crate) fn mark_handled(&self) {
        self.inner.mark_observed();
    }

    /// Whether the deferred has already been completed.
    pub fn is_completed(&self) -> bool {
        self.inner.is_done()
    }
}

impl<T: Clone + Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("completed", &self.inner.is_done())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn reject_after_fulfill_keeps_value() {
        let promise = Promise::new();
        let deferred = promise.deferred();

        assert!(!promise.is_completed());
        assert!(promise.fulfill("first"));
        assert!(!promise.reject(Error::msg("second")));
        assert!(!promise.complete(Ok("third")));

        assert!(promise.is_completed());
        assert!(deferred.is_fulfilled());
        assert_eq!(deferred.join().unwrap(), "first");
    }

    #[test]
    fn fulfill_after_reject_keeps_error() {
        let promise = Promise::<u32>::new();
        let deferred = promise.deferred();

        assert!(promise.reject(Error::msg("first")));
        assert!(!promise.fulfill(7));

        assert!(deferred.is_rejected());
        assert_eq!(deferred.join().unwrap_err().to_string(), "task failed: first");
    }
}
