//! Mutex / Condition 单元测试

use crate::runtime::sync::{Condition, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_guard_releases_on_scope_exit() {
    let lock = Mutex::new(0);
    {
        let mut guard = lock.lock();
        *guard += 1;
    }
    assert!(lock.try_lock().is_some());
}

#[test]
fn test_guard_releases_on_early_return() {
    fn bump(lock: &Mutex<u32>) -> Option<u32> {
        let mut guard = lock.lock();
        *guard += 1;
        if *guard > 0 {
            return None;
        }
        Some(*guard)
    }

    let lock = Mutex::new(0);
    assert!(bump(&lock).is_none());
    assert_eq!(*lock.try_lock().unwrap(), 1);
}

#[test]
fn test_wait_relative_times_out() {
    let lock = Mutex::new(false);
    let cond = Condition::new();

    let start = Instant::now();
    let mut guard = lock.lock();
    let timed_out = cond.wait_relative(&mut guard, Duration::from_millis(20));

    assert!(timed_out);
    assert!(!*guard);
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_wait_until_past_deadline() {
    let lock = Mutex::new(());
    let cond = Condition::new();
    let mut guard = lock.lock();
    assert!(cond.wait_until(&mut guard, Instant::now()));
}

#[test]
fn test_broadcast_wakes_all() {
    let state = Arc::new((Mutex::new(false), Condition::new()));
    let mut handles = Vec::new();

    for _ in 0..4 {
        let state = state.clone();
        handles.push(thread::spawn(move || {
            let (lock, cond) = &*state;
            let mut ready = lock.lock();
            while !*ready {
                cond.wait(&mut ready);
            }
        }));
    }

    thread::sleep(Duration::from_millis(10));
    {
        let (lock, cond) = &*state;
        *lock.lock() = true;
        cond.broadcast();
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_signal_before_timeout() {
    let state = Arc::new((Mutex::new(false), Condition::new()));
    let waiter = {
        let state = state.clone();
        thread::spawn(move || {
            let (lock, cond) = &*state;
            let mut ready = lock.lock();
            while !*ready {
                if cond.wait_relative(&mut ready, Duration::from_secs(5)) {
                    return false;
                }
            }
            true
        })
    };

    thread::sleep(Duration::from_millis(10));
    {
        let (lock, cond) = &*state;
        *lock.lock() = true;
        cond.signal();
    }

    assert!(waiter.join().unwrap());
}
