//! Logger module
//!
//! Go-style simple logging: `[LEVEL] message`
//!
//! # Usage
//!
//! ```rust
//! use looper_runtime::util::logger;
//!
//! logger::init();
//! tracing::info!("Hello, {}", "world");
//! ```
//!
//! Only the first `init*` call installs a subscriber; later calls are no-ops.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Level chosen by the first successful `init*` call.
static INSTALLED: OnceCell<LogLevel> = OnceCell::new();

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Initialize logger with default configuration (INFO level)
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Initialize logger with custom level (Go style: `[LEVEL] message`)
///
/// Returns `false` if a subscriber was already installed, by this module or
/// by the host application.
pub fn init_with_level(level: LogLevel) -> bool {
    let mut installed = false;
    INSTALLED.get_or_init(|| {
        let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

        // Go 风格：显示 [LEVEL] 前缀，显示线程名以区分 Looper，无颜色
        let layer = tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_level(true)
            .with_thread_names(true)
            .with_ansi(false)
            .compact()
            .with_filter(filter);

        installed = Registry::default().with(layer).try_init().is_ok();
        level
    });
    installed
}

/// Initialize logger for debug use (DEBUG level)
pub fn init_debug() {
    init_with_level(LogLevel::Debug);
}

/// Level installed by this module, if any.
pub fn installed_level() -> Option<LogLevel> {
    INSTALLED.get().copied()
}
