//! Looper Runtime
//!
//! Reference-counted object lifetime, blocking synchronization, and deferred
//! work on dedicated worker threads ("Loopers").
//!
//! # Example
//!
//! ```no_run
//! use looper_runtime::{Event, Looper, Result};
//! use std::time::Duration;
//!
//! fn main() -> Result<()> {
//!     let looper = Looper::new("ui")?;
//!     let event = Event::bound(|| println!("tick"), &looper);
//!     event.fire_now()?;
//!     event.fire(Duration::from_millis(10))?;
//!
//!     // Block until the worker has run everything already due.
//!     looper.post_sync(|| {}, None)?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/looper-runtime")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use runtime::context::Runtime;
pub use runtime::error::{Result, RuntimeError};
pub use runtime::event::{Event, EventHandler, Fired};
pub use runtime::looper::{Looper, LooperConfig, LooperPool, PostToken, ShutdownPolicy};
pub use runtime::shared::{Shared, WeakShared};
pub use runtime::task::{shared_runnable, FnRunnable, Runnable, SyncOutcome, SyncRunnable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "looper-runtime";
