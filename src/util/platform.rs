//! Platform queries

use std::thread;

/// Number of logical processors available to this process.
///
/// Degrades to 1 when the platform cannot tell.
pub fn available_cpus() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
