use crate::deferred::core::Inner;
use crate::error::{Error, Result};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A value or error that becomes available asynchronously, exactly once.
///
/// A `Deferred` starts pending and is completed once, either fulfilled with
/// a value or rejected with an [`Error`]; later completions are ignored.
/// Clones are handles to the same computation.
///
/// Derive new deferred values with the combinators ([`map`](Self::map),
/// [`flat_map`](Self::flat_map), [`combine`](Self::combine), ...). Read the
/// outcome with [`join`](Self::join), [`peek`](Self::peek), or by `.await`ing
/// the deferred.
///
/// Values are handed to every dependent, so most operations require
/// `T: Clone`.
pub struct Deferred<T: 'static> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T: 'static> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Deferred<T> {
    pub(crate) fn from_inner(inner: Arc<Inner<T>>) -> Self {
        Self { inner }
    }

    /// Whether the deferred has been fulfilled or rejected.
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// Whether the deferred has been fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        self.inner
            .inspect(|outcome| matches!(outcome, Some(Ok(_))))
    }

    /// Whether the deferred has been rejected.
    pub fn is_rejected(&self) -> bool {
        self.inner
            .inspect(|outcome| matches!(outcome, Some(Err(_))))
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// A deferred that is already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Self {
        Self::from_inner(Arc::new(Inner::with_outcome(Ok(value))))
    }

    /// A deferred that is already rejected with `error`.
    pub fn rejected(error: Error) -> Self {
        Self::from_inner(Arc::new(Inner::with_outcome(Err(error))))
    }

    /// Blocks the calling thread until the deferred completes and returns
    /// its outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the deferred was rejected with.
    pub fn join(&self) -> Result<T> {
        self.inner.join()
    }

    /// Blocks the calling thread until the deferred completes.
    pub fn wait(&self) {
        self.inner.wait();
    }

    /// Returns the outcome without blocking, or `None` while pending.
    pub fn peek(&self) -> Option<Result<T>> {
        self.inner.peek()
    }
}

impl<T: Clone + Send + 'static> Future for Deferred<T> {
    type Output = Result<T>;

    /// Resolves once the deferred completes.
    ///
    /// The waker is stored with the pending state under the same lock that
    /// completion takes, so a completion racing with the poll cannot be
    /// missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll(cx.waker())
    }
}

impl<T: 'static> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.inspect(|outcome| {
            let mut debug = f.debug_struct("Deferred");
            match outcome {
                None => debug.field("state", &"pending"),
                Some(Ok(_)) => debug.field("state", &"fulfilled"),
                Some(Err(error)) => debug.field("state", &"rejected").field("error", error),
            };
            debug.finish()
        })
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::deferred::Promise;
    use std::sync::Arc;
    use std::task::{Wake, Waker};
    use std::thread;
    use std::time::Duration;

    struct CountingWaker(std::sync::atomic::AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn join_blocks_until_completed() {
        let promise = Promise::new();
        let deferred = promise.deferred();

        let completer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.fulfill(String::from("done"));
        });

        assert_eq!(deferred.join().unwrap(), "done");
        completer.join().unwrap();
    }

    #[test]
    fn poll_registers_waker_once() {
        let promise = Promise::<u8>::new();
        let mut deferred = promise.deferred();

        let counter = Arc::new(CountingWaker(Default::default()));
        let waker = Waker::from(counter.clone());
        let mut cx = Context::from_waker(&waker);

        assert!(Pin::new(&mut deferred).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut deferred).poll(&mut cx).is_pending());

        promise.fulfill(3);
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(matches!(Pin::new(&mut deferred).poll(&mut cx), Poll::Ready(Ok(3))));
    }

    #[test]
    fn debug_shows_state() {
        let deferred = Deferred::<u8>::rejected(Error::EmptyAggregate);
        let rendered = format!("{deferred:?}");
        assert!(rendered.contains("rejected"));
        assert!(rendered.contains("EmptyAggregate"));
        assert!(format!("{:?}", Deferred::fulfilled(1)).contains("fulfilled"));
    }
}
