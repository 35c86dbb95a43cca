//! Blocking synchronization primitives
//!
//! `Mutex` is `parking_lot`'s lock; its guard releases the lock on every exit
//! path of the protected block. `Condition` wraps a condition variable with the
//! wait/broadcast vocabulary the rest of the runtime uses.
//!
//! A `broadcast()` issued while holding the lock happens-before the wake of any
//! thread blocked in `wait*` under the same lock, so no wakeup is missed as long
//! as the waited-on state is only mutated under that lock.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Condvar;

pub use parking_lot::{Mutex, MutexGuard};

/// A condition variable paired with a `Mutex`.
#[derive(Default)]
pub struct Condition {
    inner: Condvar,
}

impl Condition {
    /// Create a new condition.
    #[inline]
    pub const fn new() -> Self {
        Self {
            inner: Condvar::new(),
        }
    }

    /// Block until signaled.
    ///
    /// The lock is released while blocked and re-acquired before returning.
    /// Spurious wakeups are possible; callers re-check their predicate.
    #[inline]
    pub fn wait<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
    ) {
        self.inner.wait(guard);
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `true` if the wait timed out, `false` if it was signaled.
    #[inline]
    pub fn wait_relative<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Duration,
    ) -> bool {
        self.inner.wait_for(guard, timeout).timed_out()
    }

    /// Block until `deadline`.
    ///
    /// Returns `true` if the deadline passed, `false` if it was signaled.
    #[inline]
    pub fn wait_until<T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        deadline: Instant,
    ) -> bool {
        self.inner.wait_until(guard, deadline).timed_out()
    }

    /// Wake one waiter. Returns whether a thread was woken.
    #[inline]
    pub fn signal(&self) -> bool {
        self.inner.notify_one()
    }

    /// Wake all waiters. Returns the number of threads woken.
    #[inline]
    pub fn broadcast(&self) -> usize {
        self.inner.notify_all()
    }
}

impl fmt::Debug for Condition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Condition").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
