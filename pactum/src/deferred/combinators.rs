//! Combinators deriving new deferred values.
//!
//! Every combinator exists in two bindings:
//!
//! - **same-thread**, the methods on [`Deferred`] itself: the continuation
//!   runs on whichever thread completes the source, or right away on the
//!   registering thread when the source is already complete;
//! - **bound**, the methods on [`Bound`], reached through
//!   [`Deferred::via`] or [`Deferred::via_default`]: the continuation is
//!   submitted as a job to the bound executor.
//!
//! The binding is fixed when the continuation is registered.
//!
//! A panic inside a user closure rejects the derived deferred with
//! [`Error::Panicked`]. Rejections short-circuit: closures that consume a
//! value are not called when the source is rejected.

use crate::deferred::core::Outcome;
use crate::deferred::{Deferred, Promise};
use crate::error::{Error, Result};
use crate::loom::lock;
use crate::loom::sync::Mutex;
use crate::runtime::{Executor, default};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Where a continuation runs.
#[derive(Clone)]
pub(crate) enum Binding {
    SameThread,
    Executor(Arc<dyn Executor>),
}

impl Binding {
    /// Runs `job` for `promise` according to the binding.
    ///
    /// If the bound executor is closed the promise is rejected with
    /// [`Error::Closed`].
    fn dispatch<U, J>(self, promise: Promise<U>, job: J)
    where
        U: Clone + Send + 'static,
        J: FnOnce(&Promise<U>) + Send + 'static,
    {
        match self {
            Binding::SameThread => run_guarded(&promise, job),
            Binding::Executor(executor) => {
                let fallback = promise.clone();
                let job = Box::new(move || run_guarded(&promise, job));

                if executor.execute(job).is_err() {
                    tracing::warn!("continuation rejected by a closed executor");
                    fallback.reject(Error::Closed);
                }
            }
        }
    }
}

/// Runs `job`, turning a panic into a rejection of `promise`.
fn run_guarded<U, J>(promise: &Promise<U>, job: J)
where
    U: Clone + Send + 'static,
    J: FnOnce(&Promise<U>),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(promise))) {
        let error = Error::from_panic(payload);
        tracing::warn!(%error, "continuation panicked");
        promise.reject(error);
    }
}

/// A view of a [`Deferred`] whose combinators run their continuation on a
/// fixed executor.
///
/// Obtained from [`Deferred::via`] (caller-supplied executor) or
/// [`Deferred::via_default`] (the process-wide [`default`] executor).
#[must_use = "a bound view does nothing until a combinator is called on it"]
pub struct Bound<'a, T: 'static> {
    source: &'a Deferred<T>,
    binding: Binding,
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Binds the next combinator to `executor`.
    ///
    /// ```rust
    /// use pactum::{submit, ThreadPool};
    ///
    /// let io = ThreadPool::builder().worker_threads(1).name("io").build().unwrap();
    /// let cpu = ThreadPool::builder().worker_threads(1).name("cpu").build().unwrap();
    ///
    /// let doubled = submit(&io, || 21)
    ///     .via(&cpu)
    ///     .map(|n| (n * 2, std::thread::current().name().map(str::to_owned)));
    ///
    /// let (n, thread) = doubled.join().unwrap();
    /// assert_eq!(n, 42);
    /// assert_eq!(thread.as_deref(), Some("cpu-0"));
    /// ```
    pub fn via<E>(&self, executor: &E) -> Bound<'_, T>
    where
        E: Executor + Clone + 'static,
    {
        Bound {
            source: self,
            binding: Binding::Executor(Arc::new(executor.clone())),
        }
    }

    /// Binds the next combinator to the process-wide default executor.
    pub fn via_default(&self) -> Bound<'_, T> {
        Bound {
            source: self,
            binding: Binding::Executor(default::executor()),
        }
    }

    /// Registers a continuation that completes a new deferred.
    fn chain<U, F>(&self, binding: Binding, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Outcome<T>, &Promise<U>) + Send + 'static,
    {
        let promise = Promise::new();
        let derived = promise.deferred();

        self.inner.subscribe(Box::new(move |outcome| {
            binding.dispatch(promise, move |promise| f(outcome, promise));
        }));

        derived
    }

    fn map_with<U, F>(&self, binding: Binding, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| match outcome {
            Ok(value) => {
                promise.fulfill(f(value));
            }
            Err(error) => {
                promise.reject(error);
            }
        })
    }

    fn try_map_with<U, F>(&self, binding: Binding, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| {
            promise.complete(outcome.and_then(f));
        })
    }

    fn flat_map_with<U, F>(&self, binding: Binding, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| match outcome {
            Ok(value) => {
                let promise = promise.clone();
                f(value).inner.subscribe(Box::new(move |inner| {
                    promise.complete(inner);
                }));
            }
            Err(error) => {
                promise.reject(error);
            }
        })
    }

    fn on_completion_with<F>(&self, binding: Binding, f: F) -> Deferred<T>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(&outcome))) {
                let error = Error::from_panic(payload);
                tracing::warn!(%error, "completion observer panicked");
            }
            // `f` has seen the outcome, the mirror need not report it again
            promise.mark_handled();
            promise.complete(outcome);
        })
    }

    fn recover_with<F>(&self, binding: Binding, f: F) -> Deferred<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| {
            promise.fulfill(outcome.unwrap_or_else(f));
        })
    }

    fn handle_with<U, F>(&self, binding: Binding, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> U + Send + 'static,
    {
        self.chain(binding, move |outcome, promise| {
            promise.fulfill(f(outcome));
        })
    }

    fn combine_with<U, R, F>(&self, other: &Deferred<U>, binding: Binding, f: F) -> Deferred<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        let promise = Promise::new();
        let derived = promise.deferred();

        let both = Arc::new(Both {
            state: Mutex::new(BothState {
                left: None,
                right: None,
                first_error: None,
                arrived: 0,
                finish: Some((binding, promise, f)),
            }),
        });

        let left = both.clone();
        self.inner
            .subscribe(Box::new(move |outcome| left.arrive(Side::Left(outcome))));
        other
            .inner
            .subscribe(Box::new(move |outcome| both.arrive(Side::Right(outcome))));

        derived
    }

    /// Transforms the value once the deferred is fulfilled ("thenApply").
    ///
    /// A rejection is propagated unchanged and `f` is not called.
    pub fn map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map_with(Binding::SameThread, f)
    }

    /// Like [`map`](Self::map), for a fallible transformation. An `Err`
    /// returned by `f` rejects the derived deferred.
    pub fn try_map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        self.try_map_with(Binding::SameThread, f)
    }

    /// Chains a dependent asynchronous computation ("thenCompose").
    ///
    /// The derived deferred mirrors the outcome of the deferred returned by
    /// `f`; it never wraps one deferred in another.
    pub fn flat_map<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        self.flat_map_with(Binding::SameThread, f)
    }

    /// Runs `f` after the deferred is fulfilled, ignoring the value
    /// ("thenRun").
    pub fn then_run<F>(&self, f: F) -> Deferred<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.map_with(Binding::SameThread, move |_| f())
    }

    /// Consumes the value once the deferred is fulfilled ("thenAccept").
    pub fn then_accept<F>(&self, f: F) -> Deferred<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.map_with(Binding::SameThread, f)
    }

    /// Combines the values of two deferred values ("thenCombine").
    ///
    /// The derived deferred completes once both sides have completed. If
    /// either side was rejected, it is rejected with the error that arrived
    /// first and `f` is not called.
    pub fn combine<U, R, F>(&self, other: &Deferred<U>, f: F) -> Deferred<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        self.combine_with(other, Binding::SameThread, f)
    }

    /// Consumes the values of two deferred values ("thenAcceptBoth").
    pub fn accept_both<U, F>(&self, other: &Deferred<U>, f: F) -> Deferred<()>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T, U) + Send + 'static,
    {
        self.combine_with(other, Binding::SameThread, f)
    }

    /// Observes the outcome without changing it ("whenComplete").
    ///
    /// `f` runs exactly once with either the value or the error. The
    /// derived deferred mirrors this one; a panic in `f` is logged and does
    /// not alter the outcome. Since `f` handled it, a mirrored rejection is
    /// not reported to the [`observer`](crate::observer) when dropped.
    pub fn on_completion<F>(&self, f: F) -> Deferred<T>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.on_completion_with(Binding::SameThread, f)
    }

    /// Turns a rejection into a value ("exceptionally").
    ///
    /// A fulfilled deferred passes through unchanged.
    pub fn recover<F>(&self, f: F) -> Deferred<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.recover_with(Binding::SameThread, f)
    }

    /// Maps either outcome to a value ("handle").
    pub fn handle<U, F>(&self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> U + Send + 'static,
    {
        self.handle_with(Binding::SameThread, f)
    }
}

impl<'a, T: Clone + Send + 'static> Bound<'a, T> {
    /// [`Deferred::map`], running `f` on the bound executor.
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.source.map_with(self.binding, f)
    }

    /// [`Deferred::try_map`], running `f` on the bound executor.
    pub fn try_map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        self.source.try_map_with(self.binding, f)
    }

    /// [`Deferred::flat_map`], running `f` on the bound executor.
    pub fn flat_map<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Deferred<U> + Send + 'static,
    {
        self.source.flat_map_with(self.binding, f)
    }

    /// [`Deferred::then_run`], running `f` on the bound executor.
    pub fn then_run<F>(self, f: F) -> Deferred<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.source.map_with(self.binding, move |_| f())
    }

    /// [`Deferred::then_accept`], running `f` on the bound executor.
    pub fn then_accept<F>(self, f: F) -> Deferred<()>
    where
        F: FnOnce(T) + Send + 'static,
    {
        self.source.map_with(self.binding, f)
    }

    /// [`Deferred::combine`], running `f` on the bound executor.
    pub fn combine<U, R, F>(self, other: &Deferred<U>, f: F) -> Deferred<R>
    where
        U: Clone + Send + 'static,
        R: Clone + Send + 'static,
        F: FnOnce(T, U) -> R + Send + 'static,
    {
        self.source.combine_with(other, self.binding, f)
    }

    /// [`Deferred::accept_both`], running `f` on the bound executor.
    pub fn accept_both<U, F>(self, other: &Deferred<U>, f: F) -> Deferred<()>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T, U) + Send + 'static,
    {
        self.source.combine_with(other, self.binding, f)
    }

    /// [`Deferred::on_completion`], running `f` on the bound executor.
    pub fn on_completion<F>(self, f: F) -> Deferred<T>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.source.on_completion_with(self.binding, f)
    }

    /// [`Deferred::recover`], running `f` on the bound executor.
    pub fn recover<F>(self, f: F) -> Deferred<T>
    where
        F: FnOnce(Error) -> T + Send + 'static,
    {
        self.source.recover_with(self.binding, f)
    }

    /// [`Deferred::handle`], running `f` on the bound executor.
    pub fn handle<U, F>(self, f: F) -> Deferred<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Result<T>) -> U + Send + 'static,
    {
        self.source.handle_with(self.binding, f)
    }
}

/// Join point of [`Deferred::combine`].
struct Both<T, U, R: 'static, F> {
    state: Mutex<BothState<T, U, R, F>>,
}

struct BothState<T, U, R: 'static, F> {
    left: Option<T>,
    right: Option<U>,

    /// The first rejection to arrive, from either side.
    first_error: Option<Error>,

    /// Number of sides that have completed.
    arrived: u8,

    /// Taken by the arrival that completes the pair.
    finish: Option<(Binding, Promise<R>, F)>,
}

enum Side<T, U> {
    Left(Outcome<T>),
    Right(Outcome<U>),
}

impl<T, U, R, F> Both<T, U, R, F>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    R: Clone + Send + 'static,
    F: FnOnce(T, U) -> R + Send + 'static,
{
    fn arrive(&self, side: Side<T, U>) {
        let mut state = lock(&self.state);

        match side {
            Side::Left(Ok(value)) => state.left = Some(value),
            Side::Right(Ok(value)) => state.right = Some(value),
            Side::Left(Err(error)) | Side::Right(Err(error)) => {
                state.first_error.get_or_insert(error);
            }
        }

        state.arrived += 1;
        if state.arrived < 2 {
            return;
        }

        let Some((binding, promise, f)) = state.finish.take() else {
            return;
        };
        let error = state.first_error.take();
        let left = state.left.take();
        let right = state.right.take();
        drop(state);

        match (error, left, right) {
            (Some(error), _, _) => binding.dispatch(promise, move |promise| {
                promise.reject(error);
            }),
            (None, Some(left), Some(right)) => binding.dispatch(promise, move |promise| {
                promise.fulfill(f(left, right));
            }),
            (None, _, _) => {}
        }
    }
}
