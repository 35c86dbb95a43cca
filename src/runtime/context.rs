//! Process-scoped runtime state
//!
//! A [`Runtime`] owns the default Looper, a [`LooperPool`] and an allocator.
//! It is an ordinary value passed by reference; nothing is global.
//!
//! Shutdown order is fixed: the pool first, then the default Looper, so pool
//! tasks may still post back to the default Looper while they drain.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::error::Result;
use super::event::{Event, EventHandler};
use super::looper::{Looper, LooperPool, PostToken};
use super::memory::{system_allocator, Allocator, SharedBuffer};
use super::shared::Shared;
use super::task::Runnable;
use crate::util::config::{load_config, RuntimeConfig};
use crate::util::logger;

/// Runtime state: default Looper, pool and allocator.
pub struct Runtime {
    config: RuntimeConfig,
    main: Looper,
    pool: LooperPool,
    allocator: Arc<dyn Allocator>,
}

impl Runtime {
    /// Start a runtime with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Start a runtime from `config`, using the global allocator.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        Self::with_allocator(config, system_allocator())
    }

    /// Start a runtime whose buffers come from `allocator`.
    pub fn with_allocator(
        config: RuntimeConfig,
        allocator: Arc<dyn Allocator>,
    ) -> Result<Self> {
        let main = Looper::with_config(config.looper.clone())?;
        let pool = LooperPool::new(config.pool.size, &config.pool.looper_config(&config.looper))?;

        tracing::info!(
            looper = %main.name(),
            pool_size = pool.len(),
            "runtime started"
        );

        Ok(Self {
            config,
            main,
            pool,
            allocator,
        })
    }

    /// Load a TOML configuration file and start a runtime from it.
    ///
    /// A missing file yields the default configuration.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = load_config(path)?;
        Self::with_config(config)
    }

    /// Install the logger at the configured level.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logger(&self) -> bool {
        logger::init_with_level(self.config.log_level)
    }

    /// The configuration this runtime was started with.
    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The default Looper.
    #[inline]
    pub fn main_looper(&self) -> &Looper {
        &self.main
    }

    /// The Looper pool.
    #[inline]
    pub fn pool(&self) -> &LooperPool {
        &self.pool
    }

    /// The allocator behind `alloc_buffer`.
    #[inline]
    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Post to the default Looper.
    pub fn post(
        &self,
        runnable: Shared<dyn Runnable>,
        delay: Duration,
    ) -> Result<PostToken> {
        self.main.post(runnable, delay)
    }

    /// An event bound to the default Looper.
    pub fn event<H: EventHandler + 'static>(
        &self,
        handler: H,
    ) -> Event {
        Event::bound(handler, &self.main)
    }

    /// An event bound to the pool member that owns `key`.
    pub fn keyed_event<H: EventHandler + 'static>(
        &self,
        key: u64,
        handler: H,
    ) -> Event {
        Event::bound(handler, self.pool.for_key(key))
    }

    /// Allocate a zeroed, shareable buffer of `len` bytes.
    pub fn alloc_buffer(
        &self,
        len: usize,
    ) -> Result<Shared<SharedBuffer>> {
        let buffer = SharedBuffer::zeroed(len, Arc::clone(&self.allocator))?;
        Ok(Shared::new(buffer))
    }

    /// Is the default Looper still accepting posts?
    #[inline]
    pub fn is_running(&self) -> bool {
        self.main.is_running()
    }

    /// Shut down the pool, then the default Looper. Idempotent.
    pub fn shutdown(&self) {
        let was_running = self.main.is_running();
        self.pool.shutdown();
        self.main.shutdown();
        if was_running {
            tracing::info!(looper = %self.main.name(), "runtime stopped");
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("main", &self.main)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
