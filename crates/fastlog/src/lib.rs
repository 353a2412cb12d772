//! `fastlog` is an asynchronous in-process logger: callers format a line and queue it, and a
//! single background writer appends it to a daily log file and, optionally, to a colored
//! console.
//!
//! It offers:
//! - A [`LoggerHandle`] that never blocks on I/O, with [`info!`], [`error!`] and [`trace!`]
//!   macros on top of it.
//! - A [`FileSink`](sink::FileSink) writing to `logs/yyMMdd.log`, rotated at midnight UTC.
//! - A [`ConsoleSink`](sink::ConsoleSink) coloring lines by severity.
//! - A graceful shutdown that drains every queued line before the writer stops, triggered by
//!   [`shutdown`], by dropping the [`ShutdownGuard`], or by a termination signal.
//!
//! ```no_run
//! fn main() -> Result<(), fastlog::InitError> {
//!     let _guard = fastlog::init(fastlog::LoggerConfig::from_env())?;
//!
//!     fastlog::info!("build ok");
//!     fastlog::error!("fail: {}", "disk full");
//!     fastlog::trace!("entering main loop");
//!     Ok(())
//! }
//! ```

#[macro_use]
mod macros;

mod clock;
mod config;
mod error;
mod formatter;
mod lifecycle;
mod line;
pub mod queue;
mod severity;
pub mod sink;
mod worker;

#[cfg(feature = "tracing-bridge")]
mod bridge;

use std::sync::OnceLock;

#[cfg(feature = "tracing-bridge")]
pub use self::bridge::FastLogLayer;
pub use self::{
    clock::{Clock, ManualClock, SystemClock},
    config::{LoggerConfig, Settings, DEFAULT_TIMESTAMP_FORMAT, ENV_PREFIX},
    error::{ConfigError, FormatError, InitError, ShutdownError, SinkError},
    formatter::{format_template, CallSite, Formatter},
    lifecycle::{LoggerBuilder, LoggerHandle, ShutdownGuard, WRITER_THREAD_NAME},
    line::LogLine,
    severity::Severity,
    sink::MemorySink,
    worker::{WorkerExit, WorkerState, WorkerStatus, WriterWorker},
};

static GLOBAL: OnceLock<LoggerHandle> = OnceLock::new();

/// Starts the process-global logger from `config` with the default sinks.
///
/// # Errors
///
/// Returns [`InitError::AlreadyInitialized`] if a global logger was already started, or any
/// error of [`LoggerBuilder::start`].
pub fn init(config: LoggerConfig) -> Result<ShutdownGuard, InitError> {
    init_with(LoggerBuilder::new(config))
}

/// Starts the process-global logger from a configured builder.
///
/// # Errors
///
/// Same as [`init`].
pub fn init_with(builder: LoggerBuilder) -> Result<ShutdownGuard, InitError> {
    if GLOBAL.get().is_some() {
        return Err(InitError::AlreadyInitialized);
    }

    let handle = builder.start()?;
    if let Err(duplicate) = GLOBAL.set(handle.clone()) {
        // Lost a race with a concurrent `init`.
        duplicate.shutdown();
        return Err(InitError::AlreadyInitialized);
    }

    tracing::debug!(target: "fastlog", "global logger initialized");
    Ok(ShutdownGuard::new(handle))
}

/// The process-global logger, if [`init`] succeeded.
#[inline]
pub fn global() -> Option<&'static LoggerHandle> {
    GLOBAL.get()
}

/// Shuts the process-global logger down. Does nothing if it was never started.
pub fn shutdown() {
    if let Some(handle) = global() {
        handle.shutdown();
    }
}
