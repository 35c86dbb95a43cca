//! A fixed group of Loopers.
//!
//! Ordering guarantees hold per Looper only. Work that must stay ordered is
//! routed with `for_key`, which always maps a key to the same Looper.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use smallvec::SmallVec;

use super::{Looper, LooperConfig, PostToken};
use crate::runtime::error::Result;
use crate::runtime::shared::Shared;
use crate::runtime::task::Runnable;
use crate::util::platform::available_cpus;

/// A set of independent Loopers.
#[derive(Debug)]
pub struct LooperPool {
    /// Member Loopers.
    loopers: SmallVec<[Looper; 8]>,
    /// Round-robin cursor.
    next: AtomicUsize,
}

impl LooperPool {
    /// Start `size` Loopers; `0` means one per available CPU.
    ///
    /// Members are named `<config.name>-<index>` and share the rest of `config`.
    pub fn new(
        size: usize,
        config: &LooperConfig,
    ) -> Result<Self> {
        let size = if size == 0 { available_cpus() } else { size };

        let mut loopers = SmallVec::with_capacity(size);
        for index in 0..size {
            let mut member = config.clone();
            member.name = format!("{}-{}", config.name, index);
            loopers.push(Looper::with_config(member)?);
        }

        tracing::debug!(pool = %config.name, size, "looper pool started");

        Ok(Self {
            loopers,
            next: AtomicUsize::new(0),
        })
    }

    /// Start one Looper per available CPU.
    #[inline]
    pub fn with_available_cpus(config: &LooperConfig) -> Result<Self> {
        Self::new(0, config)
    }

    /// Number of Loopers.
    #[inline]
    pub fn len(&self) -> usize {
        self.loopers.len()
    }

    /// Check if the pool has no Loopers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.loopers.is_empty()
    }

    /// Looper at `index`.
    #[inline]
    pub fn get(
        &self,
        index: usize,
    ) -> Option<&Looper> {
        self.loopers.get(index)
    }

    /// The Looper that owns `key`. Stable for the lifetime of the pool.
    #[inline]
    pub fn for_key(
        &self,
        key: u64,
    ) -> &Looper {
        &self.loopers[(key % self.loopers.len() as u64) as usize]
    }

    /// The next Looper in round-robin order.
    #[inline]
    pub fn next_looper(&self) -> &Looper {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.loopers.len();
        &self.loopers[index]
    }

    /// Post to the next Looper in round-robin order.
    pub fn post(
        &self,
        runnable: Shared<dyn Runnable>,
        delay: Duration,
    ) -> Result<PostToken> {
        self.next_looper().post(runnable, delay)
    }

    /// Cancel a task posted through this pool.
    pub fn cancel(
        &self,
        token: PostToken,
    ) -> bool {
        self.loopers
            .iter()
            .find(|looper| looper.id() == token.looper_id())
            .is_some_and(|looper| looper.cancel(token))
    }

    /// Iterate over the member Loopers.
    pub fn iter(&self) -> impl Iterator<Item = &Looper> {
        self.loopers.iter()
    }

    /// Shut down every member.
    pub fn shutdown(&self) {
        for looper in &self.loopers {
            looper.shutdown();
        }
    }
}
