//! Shared 单元测试
//!
//! 测试引用计数的保持、释放与销毁时机

use crate::runtime::shared::{Shared, WeakShared};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

/// Counts how many times it has been destroyed.
struct DropCounter {
    drops: Arc<AtomicUsize>,
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

fn counter() -> (Shared<DropCounter>, Arc<AtomicUsize>) {
    let drops = Arc::new(AtomicUsize::new(0));
    let obj = Shared::new(DropCounter {
        drops: drops.clone(),
    });
    (obj, drops)
}

#[cfg(test)]
mod count_tests {
    use super::*;

    #[test]
    fn test_new_is_first_owner() {
        let obj = Shared::new(5);
        assert_eq!(obj.retain_count(), 1);
        assert!(!obj.is_shared());
        assert_eq!(*obj, 5);
    }

    #[test]
    fn test_retain_release() {
        let obj = Shared::new("payload");
        let second = obj.retain();
        assert_eq!(obj.retain_count(), 2);
        assert!(obj.is_shared());
        assert!(second.is_shared());

        second.release();
        assert_eq!(obj.retain_count(), 1);
        assert!(!obj.is_shared());
    }

    #[test]
    fn test_clone_is_retain() {
        let obj = Shared::new(1u8);
        let cloned = obj.clone();
        assert!(Shared::ptr_eq(&obj, &cloned));
        assert_eq!(cloned.retain_count(), 2);
    }

    #[test]
    fn test_ptr_eq_distinct() {
        let a = Shared::new(1);
        let b = Shared::new(1);
        assert!(!Shared::ptr_eq(&a, &b));
    }
}

#[cfg(test)]
mod lifetime_tests {
    use super::*;

    #[test]
    fn test_destroyed_on_last_release() {
        let (obj, drops) = counter();
        let a = obj.retain();
        let b = obj.retain();

        obj.release();
        a.release();
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        b.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_inner_last_owner() {
        let obj = Shared::new(String::from("last"));
        let other = obj.retain();
        assert!(Shared::into_inner(other).is_none());
        assert_eq!(Shared::into_inner(obj).as_deref(), Some("last"));
    }

    #[test]
    fn test_conservation_across_threads() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_000;

        let (obj, drops) = counter();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let owner = obj.retain();
                let barrier = barrier.clone();
                let drops = drops.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..PER_THREAD {
                        let extra = owner.retain();
                        assert_eq!(drops.load(Ordering::SeqCst), 0);
                        extra.release();
                    }
                    owner.release();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(obj.retain_count(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        obj.release();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_on_other_thread_destroys_there() {
        let (obj, drops) = counter();
        let handle = thread::spawn(move || {
            obj.release();
            drops.load(Ordering::SeqCst)
        });
        assert_eq!(handle.join().unwrap(), 1);
    }
}

#[cfg(test)]
mod weak_tests {
    use super::*;

    #[test]
    fn test_upgrade_while_alive() {
        let obj = Shared::new(7);
        let weak = obj.downgrade();
        assert!(weak.is_alive());

        let upgraded = weak.upgrade().unwrap();
        assert_eq!(*upgraded, 7);
        assert_eq!(obj.retain_count(), 2);
    }

    #[test]
    fn test_upgrade_after_release() {
        let (obj, drops) = counter();
        let weak = obj.downgrade();
        obj.release();

        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_weak_does_not_own() {
        let obj = Shared::new(());
        let _weak = obj.downgrade();
        assert_eq!(obj.retain_count(), 1);
    }

    #[test]
    fn test_empty_weak() {
        let weak: WeakShared<u32> = WeakShared::new();
        assert!(weak.upgrade().is_none());
        assert!(!WeakShared::<u32>::default().is_alive());
    }
}
