//! Runtime errors
//!
//! Errors local to one component (stopped Looper, allocator failure) are returned
//! to the immediate caller. Timeouts are not errors; see `SyncRunnable::wait`.

use thiserror::Error;

use super::memory::AllocError;
use crate::util::config::ConfigError;

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors reported by the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The Looper has been shut down and no longer accepts posts.
    #[error("looper `{name}` is stopped")]
    LooperStopped {
        /// Name of the stopped Looper.
        name: String,
    },

    /// A lifecycle contract was broken by the caller.
    #[error("lifecycle violation: {0}")]
    LifecycleViolation(&'static str),

    /// Work handed to a blocking post panicked on the worker.
    #[error("task `{tag}` panicked")]
    TaskPanicked {
        /// Tag of the panicking task.
        tag: &'static str,
    },

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The allocator could not satisfy a request.
    #[error("allocation failed: {0}")]
    Alloc(#[from] AllocError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Check if this is a stopped-Looper rejection.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, RuntimeError::LooperStopped { .. })
    }
}
