use crate::deferred::{Deferred, Promise};
use crate::error::Error;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Completes with the outcome of whichever deferred completes first
/// ("anyOf").
///
/// The other deferred values keep running; their outcomes are ignored by
/// the aggregate. Members that are already complete win in iteration
/// order. An empty input yields a deferred rejected with
/// [`Error::EmptyAggregate`].
pub fn any_of<T, I>(deferreds: I) -> Deferred<T>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let promise = Promise::new();
    let aggregate = promise.deferred();
    let mut members = 0usize;

    for deferred in deferreds {
        members += 1;
        let promise = promise.clone();
        deferred.inner.subscribe(Box::new(move |outcome| {
            promise.complete(outcome);
        }));
    }

    if members == 0 {
        promise.reject(Error::EmptyAggregate);
    }

    aggregate
}

/// Completes once every deferred is fulfilled, or as soon as any of them
/// is rejected ("allOf").
///
/// The aggregate carries no values: read each member after it completes.
/// A rejection completes the aggregate immediately with that error,
/// without waiting for or cancelling the remaining members. An empty input
/// yields a deferred rejected with [`Error::EmptyAggregate`].
pub fn all_of<T, I>(deferreds: I) -> Deferred<()>
where
    T: Clone + Send + 'static,
    I: IntoIterator<Item = Deferred<T>>,
{
    let deferreds: Vec<_> = deferreds.into_iter().collect();
    let promise = Promise::new();
    let aggregate = promise.deferred();

    if deferreds.is_empty() {
        promise.reject(Error::EmptyAggregate);
        return aggregate;
    }

    let remaining = Arc::new(AtomicUsize::new(deferreds.len()));

    for deferred in deferreds {
        let promise = promise.clone();
        let remaining = remaining.clone();

        deferred.inner.subscribe(Box::new(move |outcome| match outcome {
            Ok(_) => {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    promise.fulfill(());
                }
            }
            Err(error) => {
                promise.reject(error);
            }
        }));
    }

    aggregate
}
