//! Event 单元测试
//!
//! 测试内联触发、绑定触发、取消以及销毁后触发的竞态

use crate::runtime::event::{Event, Fired};
use crate::runtime::looper::Looper;
use crossbeam::channel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn counter_handler(count: &Arc<AtomicUsize>) -> impl Fn() + Send + Sync + 'static {
    let count = Arc::clone(count);
    move || {
        count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
fn eventually(
    timeout: Duration,
    cond: impl Fn() -> bool,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[cfg(test)]
mod unbound_tests {
    use super::*;

    #[test]
    fn test_unbound_fires_inline() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = Event::new(counter_handler(&count));

        assert!(!event.is_bound());
        assert!(event.looper().is_none());
        assert_eq!(event.fire(Duration::from_secs(10)).unwrap(), Fired::Invoked);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(event.shared_retain_count(), 0);
    }

    #[test]
    fn test_unbound_runs_on_caller_thread() {
        let caller = thread::current().id();
        let event = Event::new(move || assert_eq!(thread::current().id(), caller));
        event.fire_now().unwrap();
    }

    #[test]
    fn test_unbound_cancel_is_noop() {
        let looper = Looper::new("unbound-cancel").unwrap();
        let token = looper.post_fn(|| {}, Duration::from_secs(60)).unwrap();
        let event = Event::new(|| {});

        assert!(!event.cancel(token));
        assert!(looper.cancel(token));
    }
}

#[cfg(test)]
mod bound_tests {
    use super::*;

    #[test]
    fn test_bound_fires_on_worker() {
        let looper = Looper::new("event-worker").unwrap();
        let (tx, rx) = channel::unbounded();
        let event = Event::bound(
            move || {
                tx.send(thread::current().name().map(String::from)).unwrap();
            },
            &looper,
        );

        let fired = event.fire_now().unwrap();
        assert!(fired.token().is_some());
        assert_eq!(
            rx.recv_timeout(RECV_TIMEOUT).unwrap().as_deref(),
            Some("event-worker")
        );
        assert!(event.looper().unwrap().same_looper(&looper));
    }

    #[test]
    fn test_bound_respects_delay() {
        let looper = Looper::new("event-delay").unwrap();
        let (tx, rx) = channel::unbounded();
        let event = Event::bound(move || tx.send(Instant::now()).unwrap(), &looper);

        let start = Instant::now();
        event.fire(Duration::from_millis(20)).unwrap();
        let ran_at = rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert!(ran_at.duration_since(start) >= Duration::from_millis(20));
    }

    #[test]
    fn test_queued_firings_retain_shared_event() {
        let looper = Looper::new("event-retain").unwrap();
        let event = Event::bound(|| {}, &looper);
        assert_eq!(event.shared_retain_count(), 1);

        let first = event.fire(Duration::from_secs(60)).unwrap();
        let second = event.fire(Duration::from_secs(60)).unwrap();
        assert_eq!(event.shared_retain_count(), 3);

        assert!(event.cancel(first.token().unwrap()));
        assert!(event.cancel(second.token().unwrap()));
        assert_eq!(event.shared_retain_count(), 1);
    }

    #[test]
    fn test_cancelled_firing_never_runs() {
        let looper = Looper::new("event-cancel").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let event = Event::bound(counter_handler(&count), &looper);

        let token = event.fire(Duration::from_millis(30)).unwrap().token().unwrap();
        assert!(event.cancel(token));

        let (tx, rx) = channel::bounded(1);
        looper
            .post_fn(move || tx.send(()).unwrap(), Duration::from_millis(50))
            .unwrap();
        rx.recv_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_named_event() {
        let looper = Looper::new("event-named").unwrap();
        let event = Event::bound_named(|| {}, &looper, "tick");
        assert_eq!(event.name(), Some("tick"));
        assert!(format!("{:?}", event).contains("tick"));
    }

    #[test]
    fn test_fire_on_stopped_looper_fails() {
        let looper = Looper::new("event-stopped").unwrap();
        let event = Event::bound(|| {}, &looper);
        looper.shutdown();

        let err = event.fire_now().unwrap_err();
        assert!(err.is_stopped());
        assert_eq!(event.shared_retain_count(), 1);
    }
}

#[cfg(test)]
mod stale_tests {
    use super::*;

    #[test]
    fn test_fire_after_destruction_is_skipped() {
        let looper = Looper::new("event-stale").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let event = Event::bound(counter_handler(&count), &looper);

        event.fire(Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(1));
        drop(event);

        assert!(eventually(Duration::from_secs(2), || {
            looper.stats().stale_events() == 1
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_every_stale_firing_is_counted() {
        let looper = Looper::new("event-stale-many").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let event = Event::bound(counter_handler(&count), &looper);

        for _ in 0..3 {
            event.fire(Duration::from_millis(10)).unwrap();
        }
        drop(event);

        assert!(eventually(Duration::from_secs(2), || {
            looper.stats().stale_events() == 3
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_live_event_is_not_stale() {
        let looper = Looper::new("event-live").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let event = Event::bound(counter_handler(&count), &looper);

        for _ in 0..5 {
            event.fire_now().unwrap();
        }

        assert!(eventually(Duration::from_secs(2), || {
            count.load(Ordering::SeqCst) == 5
        }));
        assert_eq!(looper.stats().stale_events(), 0);
    }

    #[test]
    fn test_event_keeps_looper_alive() {
        let count = Arc::new(AtomicUsize::new(0));
        let event = {
            let looper = Looper::new("event-owned").unwrap();
            Event::bound(counter_handler(&count), &looper)
        };

        event.fire_now().unwrap();
        assert!(eventually(Duration::from_secs(2), || {
            count.load(Ordering::SeqCst) == 1
        }));
        assert!(event.looper().unwrap().is_running());
    }
}
