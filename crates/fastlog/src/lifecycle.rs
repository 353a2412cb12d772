//! Starting the writer, handing out [`LoggerHandle`]s and shutting down gracefully.

use std::{
    error::Error as StdError,
    fmt::{self, Display},
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use thread_priority::ThreadPriority;

use crate::{
    format_template,
    queue::{self, QueueProducer},
    sink::{default_log_directory, ConsoleSink, FileSink, Sink},
    worker::{WorkerExit, WorkerState, WorkerStatus, WriterWorker},
    CallSite, Clock, FormatError, Formatter, InitError, LogLine, LoggerConfig, Settings, Severity,
    ShutdownError, SystemClock,
};

/// Name of the writer thread.
pub const WRITER_THREAD_NAME: &str = "fastlog-writer";

type BoxedSink = Box<dyn Sink>;

/// Configures and starts a logger.
///
/// ```
/// use fastlog::{LoggerBuilder, LoggerConfig, MemorySink};
///
/// let file = MemorySink::new();
/// let config = LoggerConfig::default();
/// let logger = LoggerBuilder::new(config)
///     .file_sink(file.clone())
///     .start()
///     .unwrap();
///
/// logger.info("build ok", &[]);
/// logger.error("fail: {0}", &[&"disk full"]);
/// logger.shutdown();
///
/// let lines = file.lines();
/// assert!(lines[1].ends_with(" INF build ok\r\n"));
/// assert!(lines[2].ends_with(" ERR fail: disk full\r\n"));
/// assert!(lines[3].contains("Logging system is shutting down"));
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    file: Option<BoxedSink>,
    console: Option<BoxedSink>,
    shutdown_on_signal: bool,
}

impl fmt::Debug for LoggerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBuilder")
            .field("config", &self.config)
            .field("custom_file_sink", &self.file.is_some())
            .field("custom_console_sink", &self.console.is_some())
            .field("shutdown_on_signal", &self.shutdown_on_signal)
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder {
    /// Starts from `config`, the system clock, a [`FileSink`] and a stdout [`ConsoleSink`].
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            file: None,
            console: None,
            shutdown_on_signal: false,
        }
    }

    /// Uses `clock` for timestamps and file rotation.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Replaces the daily file sink.
    pub fn file_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.file = Some(Box::new(sink));
        self
    }

    /// Replaces the stdout console sink.
    pub fn console_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.console = Some(Box::new(sink));
        self
    }

    /// Shuts the logger down when the process receives `SIGINT` or `SIGTERM`, then lets the
    /// signal take its default effect. Unix only; ignored elsewhere.
    pub fn shutdown_on_signal(mut self, enabled: bool) -> Self {
        self.shutdown_on_signal = enabled;
        self
    }

    /// The directory the default file sink writes to.
    fn log_directory(&self) -> PathBuf {
        self.config
            .log_directory
            .clone()
            .unwrap_or_else(default_log_directory)
    }

    /// Spawns the writer thread and enqueues the startup banner.
    ///
    /// # Errors
    ///
    /// Returns [`InitError`] if the configuration is invalid, the writer thread cannot be
    /// spawned, or the signal handler cannot be registered.
    pub fn start(self) -> Result<LoggerHandle, InitError> {
        let settings = Arc::new(Settings::from_config(&self.config)?);
        let directory = self.log_directory();
        let Self {
            config,
            clock,
            file,
            console,
            shutdown_on_signal,
        } = self;

        let file = file.unwrap_or_else(|| -> BoxedSink {
            Box::new(FileSink::new(directory, Arc::clone(&clock)))
        });
        let console = console.unwrap_or_else(|| -> BoxedSink { Box::new(ConsoleSink::stdout()) });

        let (producer, consumer) = queue::unbounded();
        let status = Arc::new(WorkerStatus::default());
        let worker = WriterWorker::new(
            consumer,
            Arc::clone(&settings),
            Arc::clone(&clock),
            file,
            console,
            Arc::clone(&status),
        );

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_owned())
            .spawn(move || {
                lower_writer_priority();
                let exit = worker.run();
                let _ = done_tx.send(());
                exit
            })
            .map_err(InitError::SpawnWorker)?;

        let handle = LoggerHandle {
            inner: Arc::new(Inner {
                formatter: Formatter::new(Arc::clone(&settings), Arc::clone(&clock)),
                producer,
                settings,
                status,
                shutdown_timeout: config.shutdown_timeout(),
                writer: Mutex::new(Some(Writer {
                    thread,
                    done: done_rx,
                })),
            }),
        };

        handle.enqueue(LogLine::startup_banner(clock.now()));

        if shutdown_on_signal {
            if let Err(error) = signals::install(handle.clone()) {
                handle.shutdown();
                return Err(InitError::SignalHook(error));
            }
        }

        Ok(handle)
    }
}

/// Runs the writer below the priority of the threads that log.
fn lower_writer_priority() {
    if let Err(error) = thread_priority::set_current_thread_priority(ThreadPriority::Min) {
        tracing::debug!(target: "fastlog", ?error, "could not lower the writer thread priority");
    }
}

#[derive(Debug)]
struct Writer {
    thread: JoinHandle<WorkerExit>,
    done: Receiver<()>,
}

#[derive(Debug)]
struct Inner {
    formatter: Formatter,
    producer: QueueProducer,
    settings: Arc<Settings>,
    status: Arc<WorkerStatus>,
    shutdown_timeout: Duration,
    writer: Mutex<Option<Writer>>,
}

/// Cheaply cloneable entry point for logging.
///
/// Every logging call returns as soon as its line is queued. Calls of a disabled severity
/// return before any formatting. Malformed templates are discarded silently.
#[derive(Debug, Clone)]
pub struct LoggerHandle {
    inner: Arc<Inner>,
}

impl LoggerHandle {
    /// Runtime-mutable settings shared with the writer.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Whether calls of `severity` currently produce lines.
    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.inner.settings.is_enabled(severity)
    }

    /// State of the writer thread.
    pub fn worker_state(&self) -> WorkerState {
        self.inner.status.get()
    }

    /// Logs an info line from a positional template (see [`format_template`]).
    pub fn info(&self, template: &str, args: &[&dyn Display]) {
        self.log(Severity::Info, template, args);
    }

    /// Logs an error line from a positional template.
    pub fn error(&self, template: &str, args: &[&dyn Display]) {
        self.log(Severity::Error, template, args);
    }

    /// Logs an error value and its chain of sources as `error: cause: root cause`.
    pub fn error_report(&self, error: &(dyn StdError + 'static)) {
        self.submit(Severity::Error, |formatter| {
            formatter.format_line(Severity::Error, Report(error))
        });
    }

    /// Logs a trace line annotated with `call_site`. The message is never substituted into.
    pub fn trace(&self, message: &str, call_site: CallSite) {
        self.submit(Severity::Trace, |formatter| {
            formatter.format_trace(&call_site, message)
        });
    }

    /// Logs a line of `severity` from a positional template.
    ///
    /// [`Severity::Trace`] lines logged this way are annotated with the caller's file and line
    /// but no module path; prefer [`trace`](Self::trace).
    #[track_caller]
    pub fn log(&self, severity: Severity, template: &str, args: &[&dyn Display]) {
        let caller = CallSite::caller();
        self.submit(severity, |formatter| match severity {
            Severity::Trace => formatter.format_trace(&caller, format_template(template, args)?),
            Severity::Info | Severity::Error => {
                formatter.format_template(severity, template, args)
            }
        });
    }

    /// Logs an info line from pre-built format arguments.
    pub fn info_args(&self, args: fmt::Arguments<'_>) {
        self.log_args(Severity::Info, args);
    }

    /// Logs an error line from pre-built format arguments.
    pub fn error_args(&self, args: fmt::Arguments<'_>) {
        self.log_args(Severity::Error, args);
    }

    /// Logs a trace line from pre-built format arguments.
    pub fn trace_args(&self, call_site: CallSite, args: fmt::Arguments<'_>) {
        self.submit(Severity::Trace, |formatter| {
            formatter.format_trace(&call_site, args)
        });
    }

    /// Logs a line of `severity` from pre-built format arguments.
    ///
    /// Trace lines carry the caller's file and line, as with [`log`](Self::log).
    #[track_caller]
    pub fn log_args(&self, severity: Severity, args: fmt::Arguments<'_>) {
        let caller = CallSite::caller();
        self.submit(severity, |formatter| match severity {
            Severity::Trace => formatter.format_trace(&caller, args),
            Severity::Info | Severity::Error => formatter.format_line(severity, args),
        });
    }

    fn submit(
        &self,
        severity: Severity,
        render: impl FnOnce(&Formatter) -> Result<LogLine, FormatError>,
    ) {
        if !self.is_enabled(severity) {
            return;
        }
        match render(&self.inner.formatter) {
            Ok(line) => self.enqueue(line),
            Err(error) => {
                tracing::debug!(target: "fastlog", %error, "discarded malformed log call");
            }
        }
    }

    fn enqueue(&self, line: LogLine) {
        // Lines submitted after the queue closed are dropped.
        let _ = self.inner.producer.enqueue(line);
    }

    /// Closes the queue and waits for the writer to drain it and write the shutdown banner.
    ///
    /// Waits at most the configured shutdown timeout. Safe to call any number of times from any
    /// thread; failures are reported through `tracing` and otherwise ignored.
    pub fn shutdown(&self) {
        if let Err(error) = self.try_shutdown() {
            tracing::warn!(target: "fastlog", %error, "logger shutdown was incomplete");
        }
    }

    fn try_shutdown(&self) -> Result<(), ShutdownError> {
        let mut writer = self.inner.writer.lock();
        self.inner.producer.close();

        let Some(Writer { thread, done }) = writer.take() else {
            return Ok(());
        };

        match done.recv_timeout(self.inner.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                return Err(ShutdownError::Timeout {
                    timeout_ms: self.inner.shutdown_timeout.as_millis(),
                });
            }
        }

        let exit = thread.join().map_err(|_| ShutdownError::WorkerPanicked)?;
        tracing::debug!(target: "fastlog", ?exit, "log writer terminated");
        Ok(())
    }
}

/// Renders an error followed by its sources, separated by `": "`.
struct Report<'a>(&'a (dyn StdError + 'static));

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, ": {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}

/// Shuts the logger down when dropped.
///
/// Keep it alive for as long as the process logs, typically by binding it at the top of
/// `main`. Note that [`std::process::exit`] skips destructors.
#[must_use = "dropping the guard shuts the logger down immediately"]
#[derive(Debug)]
pub struct ShutdownGuard {
    handle: LoggerHandle,
}

impl ShutdownGuard {
    /// Creates a guard shutting down `handle` on drop.
    pub fn new(handle: LoggerHandle) -> Self {
        Self { handle }
    }

    /// The guarded logger.
    pub fn handle(&self) -> &LoggerHandle {
        &self.handle
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

#[cfg(all(unix, feature = "signal-hook"))]
mod signals {
    use std::{io, thread};

    use signal_hook::{
        consts::{SIGINT, SIGTERM},
        iterator::Signals,
        low_level,
    };

    use super::LoggerHandle;

    pub(super) fn install(handle: LoggerHandle) -> io::Result<()> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        thread::Builder::new()
            .name("fastlog-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    handle.shutdown();
                    let _ = low_level::emulate_default_handler(signal);
                }
            })?;
        Ok(())
    }
}

#[cfg(not(all(unix, feature = "signal-hook")))]
mod signals {
    use std::io;

    use super::LoggerHandle;

    #[allow(clippy::unnecessary_wraps)]
    pub(super) fn install(_handle: LoggerHandle) -> io::Result<()> {
        tracing::debug!(target: "fastlog", "signal-based shutdown is unavailable on this target");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use std::{io, time::Instant};

    use crossbeam_channel::Sender;
    use time::macros::utc_datetime;

    use super::*;
    use crate::{ManualClock, MemorySink, SinkError};

    fn start(config: LoggerConfig) -> (LoggerHandle, MemorySink) {
        let file = MemorySink::new();
        let handle = LoggerBuilder::new(config)
            .clock(ManualClock::new(utc_datetime!(2024-03-01 09:30:15.250)))
            .file_sink(file.clone())
            .console_sink(MemorySink::new())
            .start()
            .unwrap();
        (handle, file)
    }

    #[test]
    fn startup_banner_comes_first() {
        let (logger, file) = start(LoggerConfig::default());
        logger.shutdown();

        let lines = file.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("2024-03-01 09:30:15.250 Logging system is initialized"));
        assert!(lines[1].contains("2024-03-01 09:30:15.250 Logging system is shutting down"));
    }

    #[test]
    fn shutdown_is_idempotent_and_terminal() {
        let (logger, file) = start(LoggerConfig::default());
        logger.info("before", &[]);
        logger.shutdown();
        logger.shutdown();
        logger.clone().shutdown();
        logger.info("after", &[]);

        assert_eq!(logger.worker_state(), WorkerState::Terminated);
        let contents = file.contents();
        assert!(contents.contains("INF before"));
        assert!(!contents.contains("after"));
        assert_eq!(contents.matches("shutting down").count(), 1);
    }

    #[test]
    fn malformed_templates_are_discarded() {
        let (logger, file) = start(LoggerConfig::default());
        logger.error("broken {0", &[&1]);
        logger.error("missing {2}", &[&1]);
        logger.error("fine {0}", &[&1]);
        logger.shutdown();

        let lines = file.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "09:30:15.250 ERR fine 1\r\n");
    }

    #[test]
    fn oversized_alignment_is_discarded_without_panicking() {
        let (logger, file) = start(LoggerConfig::default());
        logger.info("x {0,70000}", &[&1]);
        logger.info("x {0,-3}|", &[&1]);
        logger.shutdown();

        let lines = file.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "09:30:15.250 INF x 1  |\r\n");
    }

    #[test]
    fn trace_through_log_keeps_the_call_site_prefix() {
        let (logger, file) = start(LoggerConfig::default());
        logger.log(Severity::Trace, "step {0}", &[&3]);
        let template_line = line!() - 1;
        logger.log_args(Severity::Trace, format_args!("step {}", 4));
        let args_line = line!() - 1;
        logger.shutdown();

        let lines = file.lines();
        assert_eq!(
            lines[1],
            format!("09:30:15.250 TRC lifecycle.rs:<unknown>[{template_line}] step 3\r\n")
        );
        assert_eq!(
            lines[2],
            format!("09:30:15.250 TRC lifecycle.rs:<unknown>[{args_line}] step 4\r\n")
        );
    }

    /// Blocks every write until its release channel is dropped.
    struct StalledSink {
        release: Receiver<()>,
    }

    impl Sink for StalledSink {
        fn write_line(&mut self, _line: &LogLine) -> Result<(), SinkError> {
            let _ = self.release.recv();
            Ok(())
        }
    }

    fn stalled() -> (StalledSink, Sender<()>) {
        let (release_tx, release) = crossbeam_channel::bounded(0);
        (StalledSink { release }, release_tx)
    }

    #[test]
    fn shutdown_gives_up_on_a_stuck_writer() {
        let (sink, release) = stalled();
        let logger = LoggerBuilder::new(LoggerConfig {
            shutdown_timeout_ms: 200,
            ..LoggerConfig::default()
        })
        .file_sink(sink)
        .start()
        .unwrap();
        logger.info("queued behind a stalled write", &[]);

        let started = Instant::now();
        assert_eq!(
            logger.try_shutdown(),
            Err(ShutdownError::Timeout { timeout_ms: 200 })
        );
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(200));
        assert!(waited < Duration::from_secs(5));
        assert_ne!(logger.worker_state(), WorkerState::Terminated);

        // The writer handle was given up on the first call.
        let started = Instant::now();
        assert_eq!(logger.try_shutdown(), Ok(()));
        logger.shutdown();
        assert!(started.elapsed() < Duration::from_millis(200));

        drop(release);
        let deadline = Instant::now() + Duration::from_secs(5);
        while logger.worker_state() != WorkerState::Terminated {
            assert!(Instant::now() < deadline, "writer never terminated");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn disabled_severity_produces_nothing() {
        let (logger, file) = start(LoggerConfig {
            trace_log_enabled: false,
            ..LoggerConfig::default()
        });
        logger.settings().set_enabled(Severity::Info, false);
        logger.info("hidden {0}", &[&"x"]);
        logger.trace("hidden", crate::call_site!());
        logger.settings().set_enabled(Severity::Info, true);
        logger.info("shown", &[]);
        logger.shutdown();

        let contents = file.contents();
        assert!(!contents.contains("hidden"));
        assert!(contents.contains("INF shown"));
    }

    #[derive(Debug)]
    struct Outer(io::Error);

    impl Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("could not save settings")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_report_includes_source_chain() {
        let (logger, file) = start(LoggerConfig::default());
        let error = Outer(io::Error::other("disk full"));
        logger.error_report(&error);
        logger.shutdown();

        assert_eq!(
            file.lines()[1],
            "09:30:15.250 ERR could not save settings: disk full\r\n"
        );
    }

    #[test]
    fn invalid_timestamp_format_fails_start() {
        let result = LoggerBuilder::new(LoggerConfig {
            timestamp_format: "[hour".to_owned(),
            ..LoggerConfig::default()
        })
        .file_sink(MemorySink::new())
        .start();
        assert!(matches!(result, Err(InitError::Config(_))));
    }

    #[test]
    fn guard_shuts_down_on_drop() {
        let (logger, file) = start(LoggerConfig::default());
        drop(ShutdownGuard::new(logger.clone()));

        assert_eq!(logger.worker_state(), WorkerState::Terminated);
        assert!(file.contents().contains("shutting down"));
    }
}
