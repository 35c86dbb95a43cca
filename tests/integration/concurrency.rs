//! Concurrent posting tests
//!
//! Many producers against one Looper and against a pool.

use crossbeam::channel;
use looper_runtime::{Event, Looper, LooperConfig, LooperPool, Shared};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 250;

#[test]
fn test_concurrent_posts_each_run_once_in_producer_order() {
    let looper = Looper::new("many-producers").unwrap();
    let (tx, rx) = channel::unbounded();

    (0..PRODUCERS).into_par_iter().for_each(|producer| {
        for seq in 0..PER_PRODUCER {
            let tx = tx.clone();
            looper
                .post_fn(move || tx.send((producer, seq)).unwrap(), Duration::ZERO)
                .unwrap();
        }
    });
    looper.post_sync(|| {}, Some(Duration::from_secs(10))).unwrap();
    drop(tx);

    let mut last: HashMap<usize, usize> = HashMap::new();
    let mut total = 0;
    for (producer, seq) in rx.try_iter() {
        if let Some(&prev) = last.get(&producer) {
            assert!(seq > prev, "producer {} ran {} after {}", producer, seq, prev);
        }
        last.insert(producer, seq);
        total += 1;
    }
    assert_eq!(total, PRODUCERS * PER_PRODUCER);
    assert!(looper.stats().executed() >= PRODUCERS * PER_PRODUCER);
}

#[test]
fn test_shared_event_fired_from_many_threads() {
    let looper = Looper::new("shared-fire").unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let event = Shared::new(Event::bound(
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        &looper,
    ));

    (0..PRODUCERS).into_par_iter().for_each(|_| {
        let event = event.retain();
        for _ in 0..PER_PRODUCER {
            event.fire_now().unwrap();
        }
    });
    looper.post_sync(|| {}, Some(Duration::from_secs(10))).unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), PRODUCERS * PER_PRODUCER);
    assert_eq!(event.shared_retain_count(), 1);
    assert_eq!(looper.stats().stale_events(), 0);
}

#[test]
fn test_keyed_work_stays_on_one_member() {
    let pool = LooperPool::new(4, &LooperConfig::named("keyed-pool")).unwrap();
    let (tx, rx) = channel::unbounded();

    (0..64u64).into_par_iter().for_each(|key| {
        let tx = tx.clone();
        pool.for_key(key % 8)
            .post_fn(
                move || {
                    let worker = std::thread::current().name().map(String::from);
                    tx.send((key % 8, worker)).unwrap()
                },
                Duration::ZERO,
            )
            .unwrap();
    });
    drop(tx);

    let mut owner: HashMap<u64, Option<String>> = HashMap::new();
    for (key, worker) in rx.iter().take(64) {
        let expected = owner.entry(key).or_insert_with(|| worker.clone());
        assert_eq!(*expected, worker);
    }
    assert_eq!(owner.len(), 8);
    pool.shutdown();
}
