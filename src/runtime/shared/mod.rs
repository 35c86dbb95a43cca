//! Reference-counted shared objects
//!
//! `Shared<T>` is the shared-object primitive every other runtime component is
//! built on. Its lifetime is governed by an atomic retain count:
//!
//! - `Shared::new` hands out the first owner (count = 1)
//! - `retain` creates another owner (count + 1)
//! - `release` gives one up; the owner that drops the count to 0 destroys the
//!   value on its own thread, exactly once
//!
//! Mismatched retain/release pairs cannot be expressed: an owner can only be
//! released by value, and it is released implicitly when dropped.
//!
//! `retain_count` and `is_shared` are *snapshot* queries. Another thread may
//! retain or release between the read and its use, so neither is a
//! synchronization primitive.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// An owning handle to a reference-counted object.
pub struct Shared<T: ?Sized> {
    inner: Arc<T>,
}

/// A non-owning handle to a `Shared<T>` object.
///
/// Upgrading is atomic: it either yields a new owner of a live object or `None`
/// once the last owner has been released.
pub struct WeakShared<T: ?Sized> {
    inner: Weak<T>,
}

impl<T> Shared<T> {
    /// Create a new shared object, returning its first owner.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Release this owner and return the value if it was the last one.
    ///
    /// When other owners remain this behaves like `release` and returns `None`.
    #[inline]
    pub fn into_inner(this: Self) -> Option<T> {
        Arc::into_inner(this.inner)
    }
}

impl<T: ?Sized> Shared<T> {
    /// Wrap an existing `Arc` without changing its count.
    #[inline]
    pub fn from_arc(inner: Arc<T>) -> Self {
        Self { inner }
    }

    /// Unwrap into the underlying `Arc` without changing the count.
    #[inline]
    pub fn into_arc(this: Self) -> Arc<T> {
        this.inner
    }

    /// Create a new owner of the same object.
    #[inline]
    pub fn retain(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give up this owner.
    ///
    /// If this was the last owner the object is destroyed on the calling thread
    /// before `release` returns.
    #[inline]
    pub fn release(self) {
        drop(self);
    }

    /// Snapshot of the number of owners.
    #[inline]
    pub fn retain_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Snapshot: does at least one other owner exist besides this one?
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.retain_count() > 1
    }

    /// Create a non-owning handle.
    #[inline]
    pub fn downgrade(&self) -> WeakShared<T> {
        WeakShared {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Do both handles own the same object?
    #[inline]
    pub fn ptr_eq(
        this: &Self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }
}

impl<T: ?Sized> WeakShared<T> {
    /// Try to become an owner.
    #[inline]
    pub fn upgrade(&self) -> Option<Shared<T>> {
        self.inner.upgrade().map(Shared::from_arc)
    }

    /// Snapshot: is the object still alive?
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> WeakShared<T> {
    /// A handle that never upgrades.
    #[inline]
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }
}

impl<T> Default for WeakShared<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl<T: ?Sized> Clone for WeakShared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> AsRef<T> for Shared<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> From<Arc<T>> for Shared<T> {
    fn from(inner: Arc<T>) -> Self {
        Self::from_arc(inner)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Shared")
            .field("retain_count", &self.retain_count())
            .field("value", &&*self.inner)
            .finish()
    }
}

impl<T: ?Sized> fmt::Debug for WeakShared<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("WeakShared")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests;
