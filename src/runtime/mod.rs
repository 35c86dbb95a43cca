//! Runtime system
//!
//! Reference-counted ownership, blocking synchronization, and Looper-based
//! task execution with deferred, cancellable events.

pub mod context;
pub mod error;
pub mod event;
pub mod looper;
pub mod memory;
pub mod shared;
pub mod sync;
pub mod task;
