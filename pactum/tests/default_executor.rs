use pactum::default::{self, DEFAULT_POOL_NAME};
use pactum::{Deferred, Executor, Inline, Promise};
use std::sync::Arc;
use std::thread;

fn thread_name() -> String {
    thread::current().name().unwrap_or("<unnamed>").to_string()
}

// The default executor is process-wide state, so its whole lifecycle is
// exercised sequentially in a single test.
#[test]
fn test_default_executor_lifecycle() {
    // lazily created pool
    let ran_on = Deferred::fulfilled(1)
        .via_default()
        .map(|_| thread_name())
        .join()
        .unwrap();
    assert!(ran_on.starts_with(DEFAULT_POOL_NAME), "ran on {ran_on}");

    // the same executor is handed out until shut down
    let first = default::executor();
    let second = default::executor();
    assert!(Arc::ptr_eq(&first, &second));
    drop((first, second));

    // a shut down default is replaced by a fresh pool on next use
    default::shutdown();
    let restarted = Deferred::fulfilled(2)
        .via_default()
        .map(|n| n * 2)
        .join()
        .unwrap();
    assert_eq!(restarted, 4);

    // a custom default
    let previous = default::install(Arc::new(Inline));
    assert!(previous.is_some());
    if let Some(previous) = previous {
        previous.shutdown();
    }

    let promise = Promise::new();
    let ran_on = promise.deferred().via_default().map(|_: ()| thread_name());
    let completer = promise.clone();
    thread::Builder::new()
        .name("completer".into())
        .spawn(move || completer.fulfill(()))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(ran_on.join().unwrap(), "completer");

    default::shutdown();
    let ran_on = Deferred::fulfilled(())
        .via_default()
        .map(|_| thread_name())
        .join()
        .unwrap();
    assert!(ran_on.starts_with(DEFAULT_POOL_NAME), "ran on {ran_on}");
    default::shutdown();
}
