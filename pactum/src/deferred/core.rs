use crate::deferred::{observer, trampoline};
use crate::error::Error;
use crate::loom::sync::atomic::{AtomicBool, Ordering};
use crate::loom::sync::{Condvar, Mutex};
use crate::loom::{lock, wait_while};

use std::mem;
use std::sync::PoisonError;
use std::task::{Poll, Waker};

/// Terminal outcome of a deferred computation.
pub(crate) type Outcome<T> = Result<T, Error>;

/// A callback registered while the deferred is pending.
pub(crate) type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

pub(crate) enum State<T: 'static> {
    Pending {
        /// Fired in registration order on the completing thread.
        continuations: Vec<Continuation<T>>,

        /// Tasks awaiting the deferred as a `std::future::Future`.
        wakers: Vec<Waker>,
    },
    Done(Outcome<T>),
}

/// Shared state of a deferred computation.
///
/// The state moves from `Pending` to `Done` exactly once. The lock is only
/// held to inspect or swap the state: continuations and wakers run after it
/// is released, so a continuation may freely touch other primitives.
/// Continuations run through the thread's trampoline, so completing or
/// dropping a long chain never nests stack frames per link.
pub(crate) struct Inner<T: 'static> {
    state: Mutex<State<T>>,

    /// Signalled once when the state becomes `Done`.
    condvar: Condvar,

    /// Set as soon as anything looks at the outcome or subscribes to it.
    observed: AtomicBool,
}

impl<T: 'static> Inner<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                continuations: Vec::new(),
                wakers: Vec::new(),
            }),
            condvar: Condvar::new(),
            observed: AtomicBool::new(false),
        }
    }

    pub(crate) fn with_outcome(outcome: Outcome<T>) -> Self {
        Self {
            state: Mutex::new(State::Done(outcome)),
            condvar: Condvar::new(),
            observed: AtomicBool::new(false),
        }
    }

    pub(crate) fn mark_observed(&self) {
        self.observed.store(true, Ordering::Release);
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(&*lock(&self.state), State::Done(_))
    }

    /// Runs `f` on the outcome if the state is terminal.
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(Option<&Outcome<T>>) -> R) -> R {
        match &*lock(&self.state) {
            State::Done(outcome) => f(Some(outcome)),
            State::Pending { .. } => f(None),
        }
    }
}

impl<T: Clone + Send + 'static> Inner<T> {
    /// Moves the state to `Done(outcome)`.
    ///
    /// Returns `false`, leaving the first outcome in place, if the state
    /// was already terminal.
    pub(crate) fn complete(&self, outcome: Outcome<T>) -> bool {
        let mut state = lock(&self.state);

        let (continuations, wakers) = match &mut *state {
            State::Done(_) => return false,
            State::Pending {
                continuations,
                wakers,
            } => (mem::take(continuations), mem::take(wakers)),
        };

        let fulfilled = outcome.is_ok();
        *state = State::Done(outcome.clone());
        drop(state);

        self.condvar.notify_all();
        tracing::trace!(
            fulfilled,
            continuations = continuations.len(),
            "deferred completed"
        );

        for waker in wakers {
            waker.wake();
        }

        if !continuations.is_empty() {
            trampoline::run(Box::new(move || fire(continuations, outcome)));
        }

        true
    }

    /// Registers `continuation` to receive the outcome.
    ///
    /// If the state is already terminal the continuation runs right away on
    /// the calling thread.
    pub(crate) fn subscribe(&self, continuation: Continuation<T>) {
        self.mark_observed();

        let mut state = lock(&self.state);
        let outcome = match &mut *state {
            State::Pending { continuations, .. } => {
                continuations.push(continuation);
                return;
            }
            State::Done(outcome) => outcome.clone(),
        };
        drop(state);

        continuation(outcome);
    }

    /// Blocks the calling thread until the state is terminal.
    pub(crate) fn wait(&self) {
        self.mark_observed();
        self.help_until_done();

        let _done = wait_while(&self.condvar, lock(&self.state), |state| {
            matches!(state, State::Pending { .. })
        });
    }

    /// Blocks until terminal and returns a copy of the outcome.
    pub(crate) fn join(&self) -> Outcome<T> {
        self.mark_observed();
        self.help_until_done();

        let mut state = lock(&self.state);
        loop {
            if let State::Done(outcome) = &*state {
                return outcome.clone();
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Runs completions queued on this thread's trampoline until the state
    /// is terminal or nothing is left to run.
    ///
    /// Blocking from inside a continuation would otherwise wait for a
    /// completion that is queued behind the blocked continuation itself.
    fn help_until_done(&self) {
        while !self.is_done() && trampoline::run_pending() {}
    }

    /// Returns a copy of the outcome if the state is terminal.
    pub(crate) fn peek(&self) -> Option<Outcome<T>> {
        let outcome = self.inspect(|outcome| outcome.cloned());
        if outcome.is_some() {
            self.mark_observed();
        }
        outcome
    }

    /// Future-style poll: registers `waker` while pending.
    pub(crate) fn poll(&self, waker: &Waker) -> Poll<Outcome<T>> {
        self.mark_observed();

        match &mut *lock(&self.state) {
            State::Done(outcome) => Poll::Ready(outcome.clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(waker)) {
                    wakers.push(waker.clone());
                }
                Poll::Pending
            }
        }
    }
}

/// Feeds `outcome` to `continuations` in registration order.
fn fire<T: Clone>(continuations: Vec<Continuation<T>>, outcome: Outcome<T>) {
    let mut continuations = continuations.into_iter().peekable();
    while let Some(continuation) = continuations.next() {
        if continuations.peek().is_some() {
            continuation(outcome.clone());
        } else {
            continuation(outcome);
            break;
        }
    }
}

impl<T: 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        // each pending continuation owns the promise of the next link
        let continuations = match &mut *lock(&self.state) {
            State::Pending { continuations, .. } => mem::take(continuations),
            State::Done(Err(error)) => {
                if !self.observed.load(Ordering::Acquire) {
                    observer::report_unobserved(error);
                }
                return;
            }
            State::Done(Ok(_)) => return,
        };

        if !continuations.is_empty() {
            trampoline::run(Box::new(move || drop(continuations)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom::sync::Arc;
    use crate::loom::{self, thread};
    use std::sync::Mutex as StdMutex;

    #[cfg(not(loom))]
    #[test]
    fn second_completion_is_ignored() {
        let inner = Inner::<u32>::new();
        assert!(inner.complete(Ok(1)));
        assert!(!inner.complete(Ok(2)));
        assert!(!inner.complete(Err(Error::msg("late"))));
        assert!(matches!(inner.peek(), Some(Ok(1))));
    }

    #[cfg(not(loom))]
    #[test]
    fn continuations_fire_in_registration_order() {
        let inner = Inner::<u32>::new();
        let log = std::sync::Arc::new(StdMutex::new(Vec::new()));

        for tag in 0..3 {
            let log = log.clone();
            inner.subscribe(Box::new(move |outcome| {
                log.lock().unwrap().push((tag, outcome.unwrap()));
            }));
        }
        assert!(log.lock().unwrap().is_empty());

        inner.complete(Ok(9));
        assert_eq!(*log.lock().unwrap(), vec![(0, 9), (1, 9), (2, 9)]);

        // late subscribers run immediately, on this thread
        let late = log.clone();
        inner.subscribe(Box::new(move |outcome| {
            late.lock().unwrap().push((3, outcome.unwrap()));
        }));
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn concurrent_completion_and_subscription_fire_once() {
        loom::model(|| {
            let inner = Arc::new(Inner::<u32>::new());
            let fired = Arc::new(crate::loom::sync::atomic::AtomicUsize::new(0));

            let completer = {
                let inner = inner.clone();
                thread::spawn(move || {
                    inner.complete(Ok(1));
                })
            };

            let racer = {
                let inner = inner.clone();
                thread::spawn(move || inner.complete(Ok(2)))
            };

            let f = fired.clone();
            inner.subscribe(Box::new(move |outcome| {
                assert!(outcome.is_ok());
                f.fetch_add(1, Ordering::SeqCst);
            }));

            completer.join().unwrap();
            racer.join().unwrap();

            assert_eq!(fired.load(Ordering::SeqCst), 1);
            assert!(inner.is_done());
        });
    }

    #[test]
    fn join_wakes_on_completion() {
        loom::model(|| {
            let inner = Arc::new(Inner::<u32>::new());

            let waiter = {
                let inner = inner.clone();
                thread::spawn(move || inner.join())
            };

            inner.complete(Ok(5));
            assert!(matches!(waiter.join().unwrap(), Ok(5)));
        });
    }
}
