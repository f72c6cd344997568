use pactum::{CompletionGate, ThreadPool, submit};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

#[test]
fn test_waiters_released_by_last_count_down() {
    let gate = Arc::new(CompletionGate::new(3));
    let started = Arc::new(AtomicUsize::new(0));
    let (released_tx, released_rx) = mpsc::channel();

    let waiters: Vec<_> = (0..2)
        .map(|i| {
            let gate = gate.clone();
            let started = started.clone();
            let released_tx = released_tx.clone();
            thread::spawn(move || {
                started.fetch_add(1, Ordering::SeqCst);
                gate.wait();
                released_tx.send(i).unwrap();
            })
        })
        .collect();

    // both waiters are parked in wait() before anything counts down
    while started.load(Ordering::SeqCst) < 2 {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(50));

    // each counter runs on its own thread, released one at a time
    let (counted_tx, counted_rx) = mpsc::channel();
    let triggers: Vec<_> = (0..3).map(|_| Arc::new(CompletionGate::new(1))).collect();
    let counters: Vec<_> = triggers
        .iter()
        .map(|trigger| {
            let trigger = trigger.clone();
            let gate = gate.clone();
            let counted_tx = counted_tx.clone();
            thread::spawn(move || {
                trigger.wait();
                gate.count_down();
                counted_tx.send(()).unwrap();
            })
        })
        .collect();

    for (step, trigger) in triggers.iter().enumerate() {
        trigger.count_down();
        counted_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let remaining = 2 - step;
        assert_eq!(gate.count(), remaining);
        if remaining > 0 {
            assert!(released_rx.recv_timeout(Duration::from_millis(50)).is_err());
        }
    }

    for thread in counters.into_iter().chain(waiters) {
        thread.join().unwrap();
    }

    let mut released: Vec<_> = released_rx.try_iter().collect();
    released.sort();
    assert_eq!(released, vec![0, 1]);

    // a fourth count down is a no-op
    gate.count_down();
    assert_eq!(gate.count(), 0);
    assert!(gate.is_open());
    gate.wait();
}

#[test]
fn test_wait_on_open_gate_returns() {
    let gate = CompletionGate::new(1);
    gate.count_down();

    gate.wait();
    gate.wait();
}

#[test]
fn test_deposit_before_withdraw() {
    let pool = ThreadPool::builder().worker_threads(2).name("bank").build().unwrap();
    let balance = Arc::new(AtomicI64::new(0));
    let deposited = Arc::new(CompletionGate::new(1));

    let withdraw = {
        let balance = balance.clone();
        let deposited = deposited.clone();
        submit(&pool, move || {
            deposited.wait();
            balance.fetch_sub(30, Ordering::SeqCst)
        })
    };

    let deposit = {
        let balance = balance.clone();
        let deposited = deposited.clone();
        submit(&pool, move || {
            thread::sleep(Duration::from_millis(20));
            balance.fetch_add(100, Ordering::SeqCst);
            deposited.count_down();
        })
    };

    deposit.join().unwrap();
    // the withdrawal saw the deposited balance
    assert_eq!(withdraw.join().unwrap(), 100);
    assert_eq!(balance.load(Ordering::SeqCst), 70);
}
