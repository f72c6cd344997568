//! Per-thread queue that flattens nested completions.
//!
//! Completing a deferred runs its continuations, which complete derived
//! deferred values, which run their own continuations, and so on. Done
//! naively, a chain of `n` combinators needs `n` nested stack frames on the
//! completing thread. Instead, the outermost [`run`] on a thread owns the
//! trampoline: steps issued while it is active are queued and executed one
//! after another once the current step returns. Stack depth stays constant
//! however long the chain is.
//!
//! Dropping a pending chain goes through the same queue, since releasing a
//! continuation releases the promise of the next link.

use crate::error::Error;
use crate::loom::thread_local;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

pub(crate) type Step = Box<dyn FnOnce() + 'static>;

struct Trampoline {
    /// Set while the outermost `run` of this thread drains the queue.
    active: Cell<bool>,
    steps: RefCell<VecDeque<Step>>,
}

thread_local! {
    static TRAMPOLINE: Trampoline = Trampoline {
        active: Cell::new(false),
        steps: RefCell::new(VecDeque::new()),
    };
}

/// Clears the active flag when the outermost `run` returns.
struct Active;

impl Drop for Active {
    fn drop(&mut self) {
        let _ = TRAMPOLINE.try_with(|t| t.active.set(false));
    }
}

/// Runs `step` on the calling thread.
///
/// Called from inside another step, `step` is queued and runs after the
/// current one; the outermost call returns only once the queue is empty.
pub(crate) fn run(step: Step) {
    match TRAMPOLINE.try_with(|t| t.active.replace(true)) {
        Ok(false) => {}
        Ok(true) => {
            let _ = TRAMPOLINE.try_with(|t| t.steps.borrow_mut().push_back(step));
            return;
        }
        // thread-local storage is being torn down
        Err(_) => {
            execute(step);
            return;
        }
    }

    let _active = Active;
    execute(step);
    while run_pending() {}
}

/// Runs the next queued step of the calling thread, if any.
///
/// A thread that blocks on a deferred from inside a step calls this first:
/// the completion it waits for may be queued behind the step it is in.
pub(crate) fn run_pending() -> bool {
    let next = TRAMPOLINE
        .try_with(|t| t.steps.borrow_mut().pop_front())
        .ok()
        .flatten();

    match next {
        Some(step) => {
            execute(step);
            true
        }
        None => false,
    }
}

fn execute(step: Step) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(step)) {
        let error = Error::from_panic(payload);
        tracing::warn!(%error, "continuation panicked outside of a user closure");
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn push(log: &Rc<RefCell<Vec<u32>>>, tag: u32) -> Step {
        let log = log.clone();
        Box::new(move || log.borrow_mut().push(tag))
    }

    #[test]
    fn nested_steps_run_after_the_current_one() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let outer = log.clone();
        run(Box::new(move || {
            run(push(&outer, 2));
            run(push(&outer, 3));
            outer.borrow_mut().push(1);
        }));

        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert!(!run_pending());
    }

    #[test]
    fn panicking_step_does_not_strand_the_queue() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let outer = log.clone();
        run(Box::new(move || {
            run(Box::new(|| panic!("step failed")));
            run(push(&outer, 1));
        }));

        assert_eq!(*log.borrow(), vec![1]);

        // the trampoline is usable again
        run(push(&log, 2));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn deep_nesting_uses_constant_stack() {
        fn chain(remaining: u32, count: Rc<Cell<u32>>) -> Step {
            Box::new(move || {
                count.set(count.get() + 1);
                if remaining > 0 {
                    run(chain(remaining - 1, count));
                }
            })
        }

        let count = Rc::new(Cell::new(0));
        run(chain(200_000, count.clone()));
        assert_eq!(count.get(), 200_001);
    }
}
