//! Units of work posted to a Looper.
//!
//! A `Runnable` has a single entry point, `run`. Runnables travel through the
//! runtime as `Shared<dyn Runnable>`, so the Looper, the poster, and any
//! waiter can each hold an owner.

mod sync_runnable;

pub(crate) use sync_runnable::SyncPost;
pub use sync_runnable::{SyncOutcome, SyncRunnable};

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::shared::Shared;

/// A unit of deferred work.
pub trait Runnable: Send + Sync {
    /// Execute the work.
    fn run(&self);

    /// Identifying tag, used to tell runnable kinds apart in diagnostics.
    fn tag(&self) -> Option<&'static str> {
        None
    }
}

/// Wrap a concrete runnable as a shared trait object.
#[inline]
pub fn shared_runnable<R: Runnable + 'static>(runnable: R) -> Shared<dyn Runnable> {
    Shared::from_arc(Arc::new(runnable) as Arc<dyn Runnable>)
}

/// Erase the concrete type of an already-shared runnable, keeping its owners.
#[inline]
pub fn erase_runnable<R: Runnable + 'static>(runnable: Shared<R>) -> Shared<dyn Runnable> {
    Shared::from_arc(Shared::into_arc(runnable) as Arc<dyn Runnable>)
}

/// Execution state of a runnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not yet started.
    Pending,
    /// Currently executing.
    Executing,
    /// Finished executing.
    Completed,
}

impl RunState {
    /// Convert from u8 (for atomic storage).
    #[inline]
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => RunState::Executing,
            2 => RunState::Completed,
            _ => RunState::Pending,
        }
    }

    /// Convert to u8 (for atomic storage).
    #[inline]
    pub fn as_u8(&self) -> u8 {
        match self {
            RunState::Pending => 0,
            RunState::Executing => 1,
            RunState::Completed => 2,
        }
    }
}

/// Atomic `Pending → Executing → Completed` tracker.
///
/// Only one transition out of `Pending` is ever granted.
#[derive(Debug)]
pub struct RunStateCell {
    state: AtomicU8,
}

impl RunStateCell {
    /// Create a tracker in the `Pending` state.
    #[inline]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    /// Current state (snapshot).
    #[inline]
    pub fn get(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the single `Pending → Executing` transition.
    ///
    /// Returns `false` if it was already claimed.
    #[inline]
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                RunState::Pending.as_u8(),
                RunState::Executing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Mark the work as completed.
    #[inline]
    pub fn complete(&self) {
        self.state
            .store(RunState::Completed.as_u8(), Ordering::Release);
    }
}

impl Default for RunStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// A runnable built from a closure, executed at most once.
pub struct FnRunnable {
    tag: Option<&'static str>,
    state: RunStateCell,
    work: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FnRunnable {
    /// Create a runnable from a closure.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            tag: None,
            state: RunStateCell::new(),
            work: Mutex::new(Some(Box::new(work))),
        }
    }

    /// Attach an identifying tag.
    #[inline]
    pub fn with_tag(
        mut self,
        tag: &'static str,
    ) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Current execution state.
    #[inline]
    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Take the closure out of the runnable.
    #[inline]
    fn take_work(&self) -> Option<Box<dyn FnOnce() + Send>> {
        self.work.lock().take()
    }
}

impl Runnable for FnRunnable {
    fn run(&self) {
        if !self.state.begin() {
            tracing::error!(tag = ?self.tag, "closure runnable executed more than once");
            return;
        }
        if let Some(work) = self.take_work() {
            work();
        }
        self.state.complete();
    }

    fn tag(&self) -> Option<&'static str> {
        self.tag
    }
}

impl fmt::Debug for FnRunnable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("FnRunnable")
            .field("tag", &self.tag)
            .field("state", &self.state())
            .finish()
    }
}
