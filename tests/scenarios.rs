//! Multi-threaded integration tests for the end-to-end scenarios described
//! for the channel + select runtime.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use millrace::{select, Channel, SelectCase, TrySendError};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// S1: buffered pass-through, no blocking involved.
#[test]
fn s1_buffered_pass_through() {
    init_logging();
    let c = Channel::bounded(2);
    assert_eq!(c.send('A'), Ok(()));
    assert_eq!(c.send('B'), Ok(()));
    assert_eq!(c.recv(), Ok('A'));
    assert_eq!(c.recv(), Ok('B'));
    assert_eq!(c.close(), Ok(()));
    assert_eq!(c.destroy(), Ok(()));
}

/// S2: a full channel blocks a second sender until the first message is
/// drained; the parked sender then completes and its value is observable.
#[test]
fn s2_blocking_full_unblocks_on_drain() {
    init_logging();
    let c = Channel::bounded(1);
    assert_eq!(c.try_send(1), Ok(()));
    assert!(matches!(c.try_send(2), Err(TrySendError::Full(2))));

    let barrier = Arc::new(Barrier::new(2));
    let sender = {
        let c = c.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            c.send(2)
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(c.recv(), Ok(1));
    assert_eq!(sender.join().unwrap(), Ok(()));
    assert_eq!(c.recv(), Ok(2));
}

/// S3: closing a channel wakes every parked sender with a `Closed` error; a
/// later receive still reports `Closed` even though the buffer holds data
/// that was never drained by `close` itself.
#[test]
fn s3_close_unblocks_parked_senders() {
    init_logging();
    let c = Channel::bounded(1);
    assert_eq!(c.try_send('x'), Ok(()));

    let barrier = Arc::new(Barrier::new(3));
    let spawn_blocked_send = |value: char| {
        let c = c.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            c.send(value)
        })
    };
    let t1 = spawn_blocked_send('y');
    let t2 = spawn_blocked_send('z');

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(c.close(), Ok(()));

    let r1 = t1.join().unwrap();
    let r2 = t2.join().unwrap();
    assert!(r1.is_err() && r2.is_err());

    assert!(c.recv().is_err());
}

/// S4: select picks whichever candidate is already feasible, without ever
/// parking.
#[test]
fn s4_select_picks_first_feasible() {
    init_logging();
    let a: Channel<i32> = Channel::bounded(1);
    let b: Channel<i32> = Channel::bounded(1);
    assert_eq!(b.try_send(42), Ok(()));

    let mut cases = [SelectCase::recv(&a), SelectCase::recv(&b)];
    let winner = select(&mut cases).unwrap();
    assert_eq!(winner, 1);

    let [case_a, case_b] = cases;
    assert_eq!(case_a.into_recv::<i32>(), None);
    assert_eq!(case_b.into_recv::<i32>(), Some(42));
}

/// S5: a select that has to park on a rendezvous send is woken once a
/// receiver shows up on that channel.
#[test]
fn s5_select_blocks_then_wakes() {
    init_logging();
    let a: Channel<i32> = Channel::rendezvous();
    let b: Channel<i32> = Channel::bounded(1);

    let barrier = Arc::new(Barrier::new(2));
    let handle = {
        let a = a.clone();
        let b = b.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let mut cases = [SelectCase::send(&a, 7), SelectCase::recv(&b)];
            let winner = select(&mut cases).unwrap();
            (winner, cases)
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(a.recv(), Ok(7));

    let (winner, _cases) = handle.join().unwrap();
    assert_eq!(winner, 0);
}

/// S6: a select parked on two already-full channels surfaces `Closed` as
/// soon as either one closes.
#[test]
fn s6_select_surfaces_close() {
    init_logging();
    let a: Channel<i32> = Channel::bounded(1);
    let b: Channel<i32> = Channel::bounded(1);
    assert_eq!(a.try_send(1), Ok(()));
    assert_eq!(b.try_send(2), Ok(()));

    let barrier = Arc::new(Barrier::new(2));
    let handle = {
        let a = a.clone();
        let b = b.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let mut cases = [SelectCase::send(&a, 99), SelectCase::send(&b, 100)];
            select(&mut cases)
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(b.close(), Ok(()));

    let result = handle.join().unwrap();
    assert_eq!(result, Err(millrace::SelectError(1)));
}

/// Orphan detection: a select parked on two channels is woken with `Closed`
/// once both channels it's registered on have closed, even though neither
/// close happened while the select call itself was running.
#[test]
fn orphan_detection_wakes_waiter() {
    init_logging();
    let a: Channel<i32> = Channel::bounded(1);
    let b: Channel<i32> = Channel::bounded(1);
    assert_eq!(a.try_send(1), Ok(()));
    assert_eq!(b.try_send(2), Ok(()));

    let barrier = Arc::new(Barrier::new(2));
    let handle = {
        let a = a.clone();
        let b = b.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            let mut cases = [SelectCase::send(&a, 1), SelectCase::send(&b, 2)];
            select(&mut cases)
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(a.close(), Ok(()));
    assert_eq!(b.close(), Ok(()));

    assert!(handle.join().unwrap().is_err());
}
