//! Runnables the posting thread can block on.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{RunState, RunStateCell, Runnable};
use crate::runtime::error::{Result, RuntimeError};
use crate::runtime::shared::Shared;
use crate::runtime::sync::Condition;

/// How a sync runnable reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not finished yet.
    Pending,
    /// The work returned normally.
    Ran,
    /// The work panicked.
    Panicked,
    /// The work was dropped without running.
    Abandoned,
}

struct Completions {
    count: usize,
    outcome: SyncOutcome,
}

/// A runnable that lets another thread wait until it has executed.
///
/// `execute` runs the work, then increments a completion counter and wakes all
/// waiters. Each successful `wait` consumes one completion. A timed-out `wait`
/// consumes nothing, so a completion that happens later is still observed by
/// the next `wait`.
///
/// A completion is published even when the work panics or is abandoned, so a
/// waiter always returns; check `outcome` to tell the cases apart.
///
/// This is a cooperative protocol, not a semaphore: pair exactly one `wait`
/// with the single execution. Extra waits simply block or time out.
pub struct SyncRunnable {
    tag: Option<&'static str>,
    state: RunStateCell,
    work: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    completions: Mutex<Completions>,
    completed: Condition,
}

/// Publishes the completion when `execute` leaves, by return or by unwind.
struct CompletionGuard<'a> {
    runnable: &'a SyncRunnable,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        let outcome = if thread::panicking() {
            SyncOutcome::Panicked
        } else {
            SyncOutcome::Ran
        };
        self.runnable.publish(outcome);
    }
}

impl SyncRunnable {
    /// Create a sync runnable around `work`.
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            tag: None,
            state: RunStateCell::new(),
            work: Mutex::new(Some(Box::new(work))),
            completions: Mutex::new(Completions {
                count: 0,
                outcome: SyncOutcome::Pending,
            }),
            completed: Condition::new(),
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

    /// How the runnable finished, or `Pending` while it has not.
    #[inline]
    pub fn outcome(&self) -> SyncOutcome {
        self.completions.lock().outcome
    }

    /// Snapshot of completions not yet consumed by `wait`.
    #[inline]
    pub fn pending_completions(&self) -> usize {
        self.completions.lock().count
    }

    /// Run the work and publish its completion.
    ///
    /// A second call is a lifecycle violation: the work is not run again and no
    /// completion is published. If the work panics, the completion is still
    /// published with `SyncOutcome::Panicked` and the panic keeps unwinding.
    pub fn execute(&self) -> Result<()> {
        if !self.state.begin() {
            return Err(RuntimeError::LifecycleViolation(
                "sync runnable executed more than once",
            ));
        }

        let _guard = CompletionGuard { runnable: self };
        let work = self.work.lock().take();
        if let Some(work) = work {
            work();
        }
        Ok(())
    }

    /// Give up on a runnable that never started.
    ///
    /// Drops the work unrun and publishes a completion with
    /// `SyncOutcome::Abandoned`. Returns `false` if execution already claimed
    /// the runnable.
    pub fn abandon(&self) -> bool {
        if !self.state.begin() {
            return false;
        }
        let work = self.work.lock().take();
        drop(work);
        self.publish(SyncOutcome::Abandoned);
        true
    }

    fn publish(
        &self,
        outcome: SyncOutcome,
    ) {
        self.state.complete();
        let mut completions = self.completions.lock();
        completions.outcome = outcome;
        completions.count += 1;
        self.completed.broadcast();
    }

    /// Wait for the execution to complete.
    ///
    /// `None` and `Some(Duration::ZERO)` block indefinitely. Returns `true` once
    /// a completion was observed and consumed, `false` on timeout.
    pub fn wait(
        &self,
        timeout: Option<Duration>,
    ) -> bool {
        let deadline = match timeout {
            Some(t) if !t.is_zero() => Instant::now().checked_add(t),
            _ => None,
        };

        let mut completions = self.completions.lock();
        while completions.count == 0 {
            match deadline {
                None => self.completed.wait(&mut completions),
                Some(deadline) => {
                    if self.completed.wait_until(&mut completions, deadline)
                        && completions.count == 0
                    {
                        return false;
                    }
                }
            }
        }

        completions.count -= 1;
        true
    }
}

impl Runnable for SyncRunnable {
    fn run(&self) {
        if let Err(e) = self.execute() {
            tracing::error!(tag = ?self.tag, "{}", e);
        }
    }

    fn tag(&self) -> Option<&'static str> {
        self.tag
    }
}

impl fmt::Debug for SyncRunnable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let completions = self.completions.lock();
        f.debug_struct("SyncRunnable")
            .field("tag", &self.tag)
            .field("state", &self.state())
            .field("outcome", &completions.outcome)
            .field("pending_completions", &completions.count)
            .finish()
    }
}

/// The Looper's owner of a sync runnable.
///
/// Dropping it before the runnable started, as a discarding shutdown or a
/// cancel does, abandons the runnable so its waiter wakes.
pub(crate) struct SyncPost {
    runnable: Shared<SyncRunnable>,
}

impl SyncPost {
    pub(crate) fn new(runnable: Shared<SyncRunnable>) -> Self {
        Self { runnable }
    }
}

impl Runnable for SyncPost {
    fn run(&self) {
        self.runnable.run();
    }

    fn tag(&self) -> Option<&'static str> {
        self.runnable.tag()
    }
}

impl Drop for SyncPost {
    fn drop(&mut self) {
        if self.runnable.abandon() {
            tracing::debug!(tag = ?self.runnable.tag(), "sync runnable dropped unrun");
        }
    }
}
