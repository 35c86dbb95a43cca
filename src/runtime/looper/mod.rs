//! Looper: a dedicated worker thread with a time-ordered task queue
//!
//! Any thread may `post` a runnable with a delay. The worker runs each task at
//! or after its deadline, once, in non-decreasing deadline order; tasks with
//! equal deadlines run in post order. Task bodies never run concurrently with
//! each other on the same Looper.
//!
//! # Shutdown
//!
//! `shutdown` stops accepting posts and then applies the configured
//! [`ShutdownPolicy`]:
//!
//! - `Discard` (default): queued tasks are released without running; the task
//!   currently executing, if any, finishes first.
//! - `Drain`: every queued task still runs at its deadline before the worker
//!   exits.
//!
//! Either way `shutdown` joins the worker, unless it is called from the worker
//! itself, in which case the worker is left to exit on its own.

pub mod pool;
pub mod queue;
pub mod stats;

pub use pool::LooperPool;
pub use queue::{PostToken, TimedQueue};
pub use stats::LooperStats;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::error::{Result, RuntimeError};
use super::shared::Shared;
use super::sync::Condition;
use super::task::{shared_runnable, FnRunnable, Runnable, SyncOutcome, SyncPost, SyncRunnable};

/// Delays are clamped to this to keep deadlines representable.
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Source of unique Looper ids.
static NEXT_LOOPER_ID: AtomicU64 = AtomicU64::new(1);

/// What happens to queued tasks when a Looper shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Release queued tasks without running them.
    #[default]
    Discard,
    /// Run every queued task at its deadline, then exit.
    Drain,
}

/// Looper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooperConfig {
    /// Name of the Looper and its worker thread.
    pub name: String,
    /// Worker thread stack size; the platform default when unset.
    pub stack_size: Option<usize>,
    /// Policy applied to queued tasks at shutdown.
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for LooperConfig {
    fn default() -> Self {
        Self {
            name: "looper".to_string(),
            stack_size: None,
            shutdown_policy: ShutdownPolicy::Discard,
        }
    }
}

impl LooperConfig {
    /// Default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the shutdown policy.
    #[inline]
    pub fn shutdown_policy(
        mut self,
        policy: ShutdownPolicy,
    ) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Set the worker stack size.
    #[inline]
    pub fn stack_size(
        mut self,
        size: usize,
    ) -> Self {
        self.stack_size = Some(size);
        self
    }
}

/// A handle to a Looper.
///
/// Cloning a handle retains the Looper; the Looper shuts down when the last
/// handle is dropped.
#[derive(Clone)]
pub struct Looper {
    handle: Arc<Handle>,
}

/// Owner of the worker thread.
struct Handle {
    core: Arc<Core>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// State shared between handles and the worker thread.
struct Core {
    id: u64,
    name: String,
    policy: ShutdownPolicy,
    state: Mutex<CoreState>,
    wakeup: Condition,
    stats: LooperStats,
    worker_thread: OnceCell<ThreadId>,
}

struct CoreState {
    queue: TimedQueue,
    /// Cleared by shutdown; posts are rejected afterwards.
    accepting: bool,
    /// Set by a discarding shutdown; the worker exits at its next check.
    exit: bool,
}

impl Looper {
    /// Start a Looper with the default configuration and the given name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_config(LooperConfig::named(name))
    }

    /// Start a Looper with a custom configuration.
    pub fn with_config(config: LooperConfig) -> Result<Self> {
        let id = NEXT_LOOPER_ID.fetch_add(1, Ordering::Relaxed);
        let core = Arc::new(Core {
            id,
            name: config.name.clone(),
            policy: config.shutdown_policy,
            state: Mutex::new(CoreState {
                queue: TimedQueue::new(id),
                accepting: true,
                exit: false,
            }),
            wakeup: Condition::new(),
            stats: LooperStats::default(),
            worker_thread: OnceCell::new(),
        });

        let mut builder = thread::Builder::new().name(config.name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let worker = {
            let core = core.clone();
            builder
                .spawn(move || core.worker_loop())
                .map_err(RuntimeError::Spawn)?
        };
        let _ = core.worker_thread.set(worker.thread().id());

        tracing::debug!(looper = %config.name, id, "looper started");

        Ok(Self {
            handle: Arc::new(Handle {
                core,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Post a runnable to run after `delay`.
    ///
    /// Fails with `LooperStopped` after shutdown; the runnable is then dropped
    /// and this Looper's reference to it released.
    pub fn post(
        &self,
        runnable: Shared<dyn Runnable>,
        delay: Duration,
    ) -> Result<PostToken> {
        let deadline = Instant::now() + delay.min(MAX_DELAY);
        self.post_at(runnable, deadline)
    }

    /// Post a runnable to run at or after `deadline`.
    pub fn post_at(
        &self,
        runnable: Shared<dyn Runnable>,
        deadline: Instant,
    ) -> Result<PostToken> {
        self.core().post(runnable, deadline)
    }

    /// Post a closure to run after `delay`.
    pub fn post_fn<F>(
        &self,
        f: F,
        delay: Duration,
    ) -> Result<PostToken>
    where
        F: FnOnce() + Send + 'static,
    {
        self.post(shared_runnable(FnRunnable::new(f)), delay)
    }

    /// Run a closure on the worker and block until it has executed.
    ///
    /// `timeout` follows `SyncRunnable::wait`: `None` or zero blocks
    /// indefinitely. Returns `Ok(false)` if the wait timed out. Called from the
    /// worker itself, the closure runs inline.
    ///
    /// If the closure panics, the worker survives and the caller gets
    /// `RuntimeError::TaskPanicked`. If a discarding shutdown drops the task
    /// unrun, the caller gets `RuntimeError::LooperStopped`.
    pub fn post_sync<F>(
        &self,
        f: F,
        timeout: Option<Duration>,
    ) -> Result<bool>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_current() {
            f();
            return Ok(true);
        }

        let runnable = Shared::new(SyncRunnable::new(f).with_tag("post_sync"));
        self.post(shared_runnable(SyncPost::new(runnable.retain())), Duration::ZERO)?;
        if !runnable.wait(timeout) {
            return Ok(false);
        }
        match runnable.outcome() {
            SyncOutcome::Panicked => Err(RuntimeError::TaskPanicked { tag: "post_sync" }),
            SyncOutcome::Abandoned => Err(RuntimeError::LooperStopped {
                name: self.name().to_string(),
            }),
            SyncOutcome::Ran | SyncOutcome::Pending => Ok(true),
        }
    }

    /// Withdraw a task that has not started yet.
    ///
    /// Returns `false` if the task already ran, was already cancelled, or
    /// belongs to another Looper.
    pub fn cancel(
        &self,
        token: PostToken,
    ) -> bool {
        let removed = self.core().state.lock().queue.remove(&token);
        match removed {
            Some(runnable) => {
                self.core().stats.record_cancelled();
                tracing::trace!(looper = %self.name(), seq = token.seq(), "task cancelled");
                drop(runnable);
                true
            }
            None => false,
        }
    }

    /// Stop accepting posts, apply the shutdown policy and join the worker.
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Has `shutdown` not been called yet?
    #[inline]
    pub fn is_running(&self) -> bool {
        self.core().state.lock().accepting
    }

    /// Is the calling thread this Looper's worker?
    #[inline]
    pub fn is_current(&self) -> bool {
        self.core().is_current()
    }

    /// Snapshot of the number of queued tasks.
    #[inline]
    pub fn pending(&self) -> usize {
        self.core().state.lock().queue.len()
    }

    /// Looper name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.core().name
    }

    /// Unique Looper id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.core().id
    }

    /// Shutdown policy in effect.
    #[inline]
    pub fn shutdown_policy(&self) -> ShutdownPolicy {
        self.core().policy
    }

    /// Statistics.
    #[inline]
    pub fn stats(&self) -> &LooperStats {
        &self.core().stats
    }

    /// Do both handles refer to the same Looper?
    #[inline]
    pub fn same_looper(
        &self,
        other: &Looper,
    ) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    #[inline]
    fn core(&self) -> &Core {
        &self.handle.core
    }
}

impl fmt::Debug for Looper {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Looper")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Handle {
    fn shutdown(&self) {
        self.core.stop();

        let worker = self.worker.lock().take();
        let Some(worker) = worker else {
            return;
        };

        if self.core.is_current() {
            tracing::debug!(looper = %self.core.name, "shutdown from worker thread, detaching");
            return;
        }

        if worker.join().is_err() {
            tracing::error!(looper = %self.core.name, "worker thread panicked");
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Core {
    fn is_current(&self) -> bool {
        self.worker_thread.get() == Some(&thread::current().id())
    }

    fn post(
        &self,
        runnable: Shared<dyn Runnable>,
        deadline: Instant,
    ) -> Result<PostToken> {
        let mut state = self.state.lock();
        if !state.accepting {
            drop(state);
            self.stats.record_rejected();
            tracing::warn!(looper = %self.name, tag = ?runnable.tag(), "post rejected, looper stopped");
            return Err(RuntimeError::LooperStopped {
                name: self.name.clone(),
            });
        }

        let token = state.queue.push(deadline, runnable);
        self.stats.record_posted();

        // Only a new earliest deadline changes what the worker sleeps toward.
        if state.queue.is_first(&token) {
            self.wakeup.signal();
        }
        Ok(token)
    }

    fn stop(&self) {
        let discarded = {
            let mut state = self.state.lock();
            if !state.accepting {
                return;
            }
            state.accepting = false;

            let discarded = match self.policy {
                ShutdownPolicy::Discard => {
                    state.exit = true;
                    state.queue.drain()
                }
                ShutdownPolicy::Drain => Vec::new(),
            };
            self.wakeup.broadcast();
            discarded
        };

        if !discarded.is_empty() {
            self.stats.record_discarded(discarded.len());
        }
        tracing::debug!(
            looper = %self.name,
            policy = ?self.policy,
            discarded = discarded.len(),
            "looper stopping"
        );
        // Released outside the lock: dropping a task may post or cancel.
        drop(discarded);
    }

    fn worker_loop(&self) {
        while let Some((token, runnable)) = self.next_task() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| runnable.run()));
            match outcome {
                Ok(()) => self.stats.record_executed(),
                Err(_) => {
                    self.stats.record_panicked();
                    tracing::error!(
                        looper = %self.name,
                        seq = token.seq(),
                        tag = ?runnable.tag(),
                        "task panicked"
                    );
                }
            }
            drop(runnable);
        }
        tracing::debug!(looper = %self.name, "looper worker exited");
    }

    /// Block until the earliest task is due, or return `None` when the worker
    /// should exit.
    fn next_task(&self) -> Option<(PostToken, Shared<dyn Runnable>)> {
        let mut state = self.state.lock();
        loop {
            if state.exit || (!state.accepting && state.queue.is_empty()) {
                return None;
            }

            if let Some(entry) = state.queue.pop_due(Instant::now()) {
                return Some(entry);
            }

            match state.queue.peek_deadline() {
                Some(deadline) => {
                    self.wakeup.wait_until(&mut state, deadline);
                }
                None => self.wakeup.wait(&mut state),
            }
        }
    }
}
